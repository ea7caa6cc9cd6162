//! Connection options and the cache key derived from them.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::constants::DEFAULT_CONNECTION_TIMEOUT_SECS;

/// Authentication scheme used to synthesize an `Authorization` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authentication {
    /// No header is synthesized.
    #[default]
    None,
    /// `Basic base64(username:password)`.
    Basic,
    /// `Bearer <token>`.
    #[serde(alias = "bearer")]
    OAuth,
}

/// Where the TLS client certificate comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateSource {
    /// No client certificate is presented.
    #[default]
    None,
    /// PEM bundle read from `certificate_file_path`.
    File,
    /// Base64-encoded PEM bundle in `certificate_base64`.
    Base64,
    /// Bundle looked up by `certificate_thumbprint` in the certificate store.
    Store,
}

impl CertificateSource {
    /// Lowercase label used in logs and errors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::File => "file",
            Self::Base64 => "base64",
            Self::Store => "store",
        }
    }
}

/// Options controlling how a client connects and authenticates.
///
/// Every field except `token` is connection-relevant and part of the
/// [`ClientCacheKey`]; the bearer token is attached per request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    /// Authentication scheme for the synthesized `Authorization` header.
    pub authentication: Authentication,
    /// Basic authentication user name.
    pub username: String,
    /// Basic authentication password.
    pub password: String,
    /// OAuth bearer token.
    pub token: String,
    /// Source of the TLS client certificate.
    pub client_certificate_source: CertificateSource,
    /// PEM bundle path for [`CertificateSource::File`].
    pub certificate_file_path: Option<PathBuf>,
    /// Base64 PEM bundle for [`CertificateSource::Base64`].
    pub certificate_base64: String,
    /// Passphrase of the private key.
    pub certificate_key_phrase: String,
    /// Thumbprint for [`CertificateSource::Store`].
    pub certificate_thumbprint: String,
    /// Present the whole certificate chain instead of only the leaf.
    pub load_entire_chain: bool,
    /// Accept invalid server certificates.
    pub allow_invalid_certificate: bool,
    /// Seconds to wait for the response headers; `0` waits indefinitely.
    /// The body transfer itself is not limited.
    pub connection_timeout_seconds: u64,
    /// Follow HTTP redirects.
    pub follow_redirects: bool,
    /// Tolerate unknown charsets in `Content-Type`; the body is written as raw bytes regardless.
    pub allow_invalid_response_content_type_char_set: bool,
    /// Fail on non-success status codes instead of saving the body.
    pub throw_on_error_response: bool,
    /// Keep a per-client cookie store.
    pub automatic_cookie_handling: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            authentication: Authentication::None,
            username: String::new(),
            password: String::new(),
            token: String::new(),
            client_certificate_source: CertificateSource::None,
            certificate_file_path: None,
            certificate_base64: String::new(),
            certificate_key_phrase: String::new(),
            certificate_thumbprint: String::new(),
            load_entire_chain: false,
            allow_invalid_certificate: false,
            connection_timeout_seconds: DEFAULT_CONNECTION_TIMEOUT_SECS,
            follow_redirects: true,
            allow_invalid_response_content_type_char_set: false,
            throw_on_error_response: true,
            automatic_cookie_handling: true,
        }
    }
}

impl ClientOptions {
    /// Options using Basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            authentication: Authentication::Basic,
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Options using OAuth bearer authentication.
    #[must_use]
    pub fn oauth(token: impl Into<String>) -> Self {
        Self {
            authentication: Authentication::OAuth,
            token: token.into(),
            ..Self::default()
        }
    }

    /// Derives the key under which a client built from these options is cached.
    #[must_use]
    pub fn cache_key(&self) -> ClientCacheKey {
        ClientCacheKey {
            authentication: self.authentication,
            username: self.username.clone(),
            password: self.password.clone(),
            client_certificate_source: self.client_certificate_source,
            certificate_file_path: self.certificate_file_path.clone(),
            certificate_base64: self.certificate_base64.clone(),
            certificate_key_phrase: self.certificate_key_phrase.clone(),
            certificate_thumbprint: self.certificate_thumbprint.clone(),
            load_entire_chain: self.load_entire_chain,
            allow_invalid_certificate: self.allow_invalid_certificate,
            connection_timeout_seconds: self.connection_timeout_seconds,
            follow_redirects: self.follow_redirects,
            allow_invalid_response_content_type_char_set: self
                .allow_invalid_response_content_type_char_set,
            throw_on_error_response: self.throw_on_error_response,
            automatic_cookie_handling: self.automatic_cookie_handling,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("authentication", &self.authentication)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("token", &redacted(&self.token))
            .field("client_certificate_source", &self.client_certificate_source)
            .field("certificate_file_path", &self.certificate_file_path)
            .field("certificate_base64", &redacted(&self.certificate_base64))
            .field("certificate_key_phrase", &redacted(&self.certificate_key_phrase))
            .field("certificate_thumbprint", &self.certificate_thumbprint)
            .field("load_entire_chain", &self.load_entire_chain)
            .field("allow_invalid_certificate", &self.allow_invalid_certificate)
            .field("connection_timeout_seconds", &self.connection_timeout_seconds)
            .field("follow_redirects", &self.follow_redirects)
            .field(
                "allow_invalid_response_content_type_char_set",
                &self.allow_invalid_response_content_type_char_set,
            )
            .field("throw_on_error_response", &self.throw_on_error_response)
            .field("automatic_cookie_handling", &self.automatic_cookie_handling)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "<redacted>" }
}

/// Connection identity of a client: every [`ClientOptions`] field except `token`.
///
/// Two option sets with equal keys share one cached client.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientCacheKey {
    authentication: Authentication,
    username: String,
    password: String,
    client_certificate_source: CertificateSource,
    certificate_file_path: Option<PathBuf>,
    certificate_base64: String,
    certificate_key_phrase: String,
    certificate_thumbprint: String,
    load_entire_chain: bool,
    allow_invalid_certificate: bool,
    connection_timeout_seconds: u64,
    follow_redirects: bool,
    allow_invalid_response_content_type_char_set: bool,
    throw_on_error_response: bool,
    automatic_cookie_handling: bool,
}

impl fmt::Debug for ClientCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCacheKey")
            .field("authentication", &self.authentication)
            .field("username", &self.username)
            .field("client_certificate_source", &self.client_certificate_source)
            .field("certificate_thumbprint", &self.certificate_thumbprint)
            .field("connection_timeout_seconds", &self.connection_timeout_seconds)
            .finish_non_exhaustive()
    }
}
