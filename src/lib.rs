//! HTTP file download library
//!
//! This library fetches a remote resource over HTTP(S) and persists it to a
//! local file, reusing configured HTTP clients across invocations that share
//! the same connection-relevant settings.
//!
//! # Architecture
//!
//! The library is organized around the [`download`] module:
//! - [`download::ClientFactory`] - builds a configured transport (TLS, redirects, cookies, timeout)
//! - [`download::ClientCache`] - sliding-expiration cache of built clients
//! - [`download::compose_headers`] - caller headers merged with authentication
//! - [`download::Downloader`] - streams a GET response into a newly created file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use download::{
    Authentication, CertificateSource, ClientCache, ClientCacheConfig, ClientFactory,
    ClientOptions, ComposedHeaders, ConfigurationError, DownloadError, DownloadRequest,
    DownloadResult, Downloader, Header, compose_headers,
};
pub use tokio_util::sync::CancellationToken;
