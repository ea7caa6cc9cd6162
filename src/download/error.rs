//! Error types for the download module.
//!
//! [`ConfigurationError`] covers client construction (authentication and TLS
//! certificate settings). [`DownloadError`] is the single error returned by
//! [`Downloader::download`](super::Downloader::download) and keeps the root
//! cause reachable through `source()`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a client from [`ClientOptions`](super::ClientOptions).
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The selected certificate source requires a field that was left empty.
    #[error("certificate source {source_kind} requires `{field}` to be set")]
    MissingCertificateField {
        /// Name of the selected certificate source.
        source_kind: &'static str,
        /// Name of the missing option field.
        field: &'static str,
    },

    /// The certificate file could not be read.
    #[error("cannot read client certificate {path}: {source}")]
    CertificateFile {
        /// Path of the certificate file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Inline certificate material is not valid base64.
    #[error("client certificate is not valid base64: {source}")]
    InvalidBase64 {
        /// The underlying decode error.
        #[source]
        source: base64::DecodeError,
    },

    /// Certificate material could not be turned into a TLS identity.
    #[error("invalid client certificate: {reason}")]
    InvalidCertificate {
        /// Why the certificate was rejected.
        reason: String,
    },

    /// The bundle holds an encrypted private key, which the TLS backend cannot load.
    #[error("client certificate private key is encrypted; provide an unencrypted PEM key")]
    EncryptedPrivateKey,

    /// Thumbprint lookup was requested but no certificate store is configured.
    #[error("no certificate store configured for thumbprint lookup")]
    CertificateStoreUnavailable,

    /// The certificate store directory could not be listed.
    #[error("cannot read certificate store {path}: {source}")]
    CertificateStore {
        /// Store directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No certificate in the store matches the requested thumbprint.
    #[error("no certificate with thumbprint {thumbprint} found in {store}")]
    ThumbprintNotFound {
        /// Normalized thumbprint that was searched for.
        thumbprint: String,
        /// Store directory that was searched.
        store: PathBuf,
    },

    /// The HTTP client builder rejected the configuration.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors that can occur during a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A required argument is missing or malformed (empty URL, bad path).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the input.
        reason: String,
    },

    /// A composed header cannot be sent (invalid name or value).
    #[error("cannot add header {name}: {reason}")]
    InvalidHeader {
        /// Header name as supplied.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// The client for the supplied options could not be built.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A file already exists at the destination path.
    #[error("destination already exists: {path}")]
    FileExists {
        /// The destination path.
        path: PathBuf,
    },

    /// The cancellation signal fired before the download completed.
    #[error("download of {url} was cancelled")]
    Cancelled {
        /// The URL being downloaded.
        url: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, stream interruption).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// No response arrived within the connection timeout.
    ///
    /// Only the request phase is limited; once headers arrive the body may
    /// take as long as it needs.
    #[error("timeout downloading {url}: no response after {}s", .after.as_secs())]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// Non-success HTTP response while error responses are configured to fail.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while creating or writing the destination.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a transport error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error for a request phase that exceeded `after`.
    pub fn timeout(url: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            after,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error, mapping `AlreadyExists` to [`DownloadError::FileExists`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            Self::FileExists { path: path.into() }
        } else {
            Self::Io {
                path: path.into(),
                source,
            }
        }
    }

    /// Returns true when the error was caused by the cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

// Note on From trait implementations:
// Only `ConfigurationError` converts implicitly. reqwest and IO errors need the
// url or path as context, so the helper constructors above are used instead.
