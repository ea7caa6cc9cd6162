//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use http_download_file::download::{
    Authentication, CertificateSource, ClientOptions, DEFAULT_CONNECTION_TIMEOUT_SECS,
    DownloadRequest, Header,
};

/// Fetch a URL over HTTP(S) into a new local file.
///
/// The destination must not exist; it is never overwritten.
#[derive(Parser, Debug)]
#[command(name = "download-file")]
#[command(author, version, about)]
pub struct Args {
    /// URL to download
    pub url: String,

    /// Destination file path (must not exist)
    pub path: PathBuf,

    /// Request header as `Name: Value` (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<Header>,

    /// Authentication scheme
    #[arg(long, value_enum, default_value_t = AuthArg::None)]
    pub auth: AuthArg,

    /// Username for basic authentication
    #[arg(long, default_value = "")]
    pub username: String,

    /// Password for basic authentication
    #[arg(long, env = "DOWNLOAD_FILE_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Bearer token for OAuth authentication
    #[arg(long, env = "DOWNLOAD_FILE_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// Where the TLS client certificate comes from
    #[arg(long, value_enum, default_value_t = CertSourceArg::None)]
    pub cert_source: CertSourceArg,

    /// PEM bundle with client certificate and key (for --cert-source file)
    #[arg(long)]
    pub cert_file: Option<PathBuf>,

    /// Base64-encoded PEM bundle (for --cert-source base64)
    #[arg(long, default_value = "")]
    pub cert_base64: String,

    /// Private key passphrase
    #[arg(long, default_value = "")]
    pub key_phrase: String,

    /// Certificate thumbprint, SHA-1 or SHA-256 hex (for --cert-source store)
    #[arg(long, default_value = "")]
    pub thumbprint: String,

    /// Present the whole certificate chain, not only the leaf
    #[arg(long)]
    pub load_entire_chain: bool,

    /// Accept invalid server certificates
    #[arg(long)]
    pub allow_invalid_certificate: bool,

    /// Tolerate unknown charsets in the response `Content-Type`
    #[arg(long)]
    pub allow_invalid_charset: bool,

    /// Seconds to wait for the response headers (0 waits indefinitely)
    #[arg(long, default_value_t = DEFAULT_CONNECTION_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Do not follow redirects
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Disable the cookie store
    #[arg(long)]
    pub no_cookies: bool,

    /// Save error response bodies instead of failing
    #[arg(long)]
    pub no_throw_on_error: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/http-download-file/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Authentication scheme argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthArg {
    None,
    Basic,
    #[value(alias = "bearer")]
    Oauth,
}

impl From<AuthArg> for Authentication {
    fn from(value: AuthArg) -> Self {
        match value {
            AuthArg::None => Self::None,
            AuthArg::Basic => Self::Basic,
            AuthArg::Oauth => Self::OAuth,
        }
    }
}

/// Certificate source argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CertSourceArg {
    None,
    File,
    Base64,
    Store,
}

impl From<CertSourceArg> for CertificateSource {
    fn from(value: CertSourceArg) -> Self {
        match value {
            CertSourceArg::None => Self::None,
            CertSourceArg::File => Self::File,
            CertSourceArg::Base64 => Self::Base64,
            CertSourceArg::Store => Self::Store,
        }
    }
}

impl Args {
    /// Client options described by the flags.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            authentication: self.auth.into(),
            username: self.username.clone(),
            password: self.password.clone(),
            token: self.token.clone(),
            client_certificate_source: self.cert_source.into(),
            certificate_file_path: self.cert_file.clone(),
            certificate_base64: self.cert_base64.clone(),
            certificate_key_phrase: self.key_phrase.clone(),
            certificate_thumbprint: self.thumbprint.clone(),
            load_entire_chain: self.load_entire_chain,
            allow_invalid_certificate: self.allow_invalid_certificate,
            connection_timeout_seconds: self.timeout,
            follow_redirects: !self.no_follow_redirects,
            allow_invalid_response_content_type_char_set: self.allow_invalid_charset,
            throw_on_error_response: !self.no_throw_on_error,
            automatic_cookie_handling: !self.no_cookies,
        }
    }

    /// The download request described by the arguments.
    #[must_use]
    pub fn download_request(&self) -> DownloadRequest {
        DownloadRequest {
            url: self.url.clone(),
            destination_path: self.path.clone(),
            headers: self.headers.clone(),
            options: self.client_options(),
        }
    }

    /// Default log filter derived from `--quiet` and `-v`.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

fn parse_header(raw: &str) -> Result<Header, String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: Value`, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in `{raw}`"));
    }
    Ok(Header::new(name, value.trim()))
}
