//! Builds configured HTTP clients from [`ClientOptions`].

use std::path::{Path, PathBuf};

use reqwest::{Client, ClientBuilder, redirect};
use tracing::{debug, instrument};

use super::certificate::load_identity;
use super::constants::MAX_REDIRECTS;
use super::error::ConfigurationError;
use super::options::ClientOptions;

/// Constructs `reqwest::Client`s for a set of options.
///
/// Building performs no network I/O. Certificate material may be read from
/// disk (file source or the thumbprint store).
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    certificate_store: Option<PathBuf>,
}

impl ClientFactory {
    /// Creates a factory without a certificate store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `dir` as the store searched for thumbprint-selected certificates.
    #[must_use]
    pub fn with_certificate_store(mut self, dir: impl Into<PathBuf>) -> Self {
        self.certificate_store = Some(dir.into());
        self
    }

    /// Directory used for thumbprint lookups, if configured.
    #[must_use]
    pub fn certificate_store(&self) -> Option<&Path> {
        self.certificate_store.as_deref()
    }

    /// Builds a client with TLS, redirect and cookie settings from `options`.
    ///
    /// `connection_timeout_seconds` is not set on the client: a client-wide
    /// timeout would also cover the body. The downloader limits only the
    /// request phase.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the client certificate cannot be
    /// loaded or the builder rejects the configuration.
    #[instrument(level = "debug", skip_all)]
    pub fn build(&self, options: &ClientOptions) -> Result<Client, ConfigurationError> {
        let mut builder = base_client_builder(options);

        if let Some(identity) = load_identity(options, self.certificate_store())? {
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigurationError::ClientBuild { source: e })?;
        debug!(
            follow_redirects = options.follow_redirects,
            cookies = options.automatic_cookie_handling,
            "built HTTP client"
        );
        Ok(client)
    }
}

fn base_client_builder(options: &ClientOptions) -> ClientBuilder {
    let redirect_policy = if options.follow_redirects {
        redirect::Policy::limited(MAX_REDIRECTS)
    } else {
        redirect::Policy::none()
    };

    Client::builder()
        .redirect(redirect_policy)
        .cookie_store(options.automatic_cookie_handling)
        .danger_accept_invalid_certs(options.allow_invalid_certificate)
}
