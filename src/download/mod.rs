//! HTTP download pipeline with cached, reusable clients.
//!
//! This module provides everything needed to fetch a URL into a new local file:
//!
//! - [`ClientOptions`] describe how a client connects (auth, TLS, redirects, cookies, timeout)
//! - [`ClientFactory`] turns options into a configured `reqwest::Client`
//! - [`ClientCache`] keeps built clients alive with a sliding expiration window
//! - [`compose_headers`] merges caller headers with an authentication header
//! - [`Downloader`] streams the response body into a newly created file
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use http_download_file::download::{ClientCache, ClientOptions, DownloadRequest, Downloader};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ClientCache::default());
//! let downloader = Downloader::new(Arc::clone(&cache));
//! let request = DownloadRequest::new("https://example.com/report.pdf", "./report.pdf")
//!     .with_options(ClientOptions::default());
//! let result = downloader.download(&request, &CancellationToken::new()).await?;
//! println!("Downloaded: {}", result.file_path.display());
//! # Ok(())
//! # }
//! ```

mod cache;
mod certificate;
mod constants;
mod downloader;
mod error;
mod factory;
mod headers;
mod options;

pub use cache::{ClientCache, ClientCacheConfig};
pub use constants::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_SLIDING_EXPIRATION, DEFAULT_SWEEP_INTERVAL,
    MAX_REDIRECTS,
};
pub use downloader::{DownloadRequest, DownloadResult, Downloader};
pub use error::{ConfigurationError, DownloadError};
pub use factory::ClientFactory;
pub use headers::{ComposedHeaders, Header, compose_headers};
pub use options::{Authentication, CertificateSource, ClientCacheKey, ClientOptions};

// Note: Per project convention, we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
