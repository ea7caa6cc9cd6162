//! Streaming download of a single URL into a newly created file.
//!
//! The [`Downloader`] resolves a client from the shared [`ClientCache`],
//! attaches the composed headers to the individual request (never to the
//! shared client), and copies the response body to disk chunk by chunk while
//! watching a cancellation token.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::cache::ClientCache;
use super::error::DownloadError;
use super::headers::{Header, compose_headers};
use super::options::ClientOptions;

/// Input for a single download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadRequest {
    /// Absolute http(s) URL to fetch.
    pub url: String,
    /// Path of the file to create; it must not exist yet.
    pub destination_path: PathBuf,
    /// Caller headers in the order supplied.
    pub headers: Vec<Header>,
    /// Connection and authentication settings.
    pub options: ClientOptions,
}

impl DownloadRequest {
    /// Creates a request with default options and no headers.
    pub fn new(url: impl Into<String>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination_path: destination_path.into(),
            headers: Vec::new(),
            options: ClientOptions::default(),
        }
    }

    /// Appends a caller header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Replaces the client options.
    #[must_use]
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }
}

/// Outcome of a successful download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    /// Always true; failures are reported as [`DownloadError`].
    pub success: bool,
    /// Absolute path of the created file.
    pub file_path: PathBuf,
}

/// Downloads URLs into new files using clients from a shared [`ClientCache`].
///
/// Cloning is cheap; clones share the cache.
#[derive(Debug, Clone)]
pub struct Downloader {
    cache: Arc<ClientCache>,
}

impl Downloader {
    /// Creates a downloader backed by `cache`.
    #[must_use]
    pub fn new(cache: Arc<ClientCache>) -> Self {
        Self { cache }
    }

    /// The shared client cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    /// Fetches `request.url` and streams the body into `request.destination_path`.
    ///
    /// The destination is created exclusively; an existing file is never
    /// overwritten. If a failure happens after the file was created, the
    /// partially written file is left on disk.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidArgument`] for an empty or unparsable URL or an empty path
    /// - [`DownloadError::Configuration`] if the client cannot be built
    /// - [`DownloadError::InvalidHeader`] if a header cannot be sent
    /// - [`DownloadError::Cancelled`] if `cancel` fires before completion
    /// - [`DownloadError::FileExists`] if the destination already exists
    /// - [`DownloadError::Network`], [`DownloadError::Timeout`],
    ///   [`DownloadError::HttpStatus`] or [`DownloadError::Io`] for transfer failures
    #[must_use = "download result contains the path of the created file"]
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult, DownloadError> {
        let url = validate_request(request)?;
        let url_str = url.as_str();
        if cancel.is_cancelled() {
            return Err(DownloadError::cancelled(url_str));
        }

        let client = self.resolve_client(&request.options, url_str, cancel).await?;
        let headers = compose_headers(&request.headers, &request.options).to_header_map()?;

        debug!("sending request");
        let send = client.get(url.clone()).headers(headers).send();
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url_str)),
            result = with_request_timeout(send, request.options.connection_timeout_seconds) => {
                match result {
                    Some(sent) => sent.map_err(|e| DownloadError::network(url_str, e))?,
                    None => {
                        return Err(DownloadError::timeout(
                            url_str,
                            Duration::from_secs(request.options.connection_timeout_seconds),
                        ));
                    }
                }
            }
        };
        let response = check_status(response, url_str, request.options.throw_on_error_response)?;

        let path = request.destination_path.as_path();
        let file = create_new_file(path).await?;

        let bytes = match stream_to_file(file, response, url_str, path, cancel).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "download failed; partial file left on disk");
                return Err(error);
            }
        };

        let file_path = std::path::absolute(path).map_err(|e| DownloadError::io(path, e))?;
        info!(path = %file_path.display(), bytes, "download complete");
        Ok(DownloadResult {
            success: true,
            file_path,
        })
    }
}

impl Downloader {
    /// Gets the client from the cache on the blocking pool.
    ///
    /// A cache miss may read certificate material from disk and holds the
    /// entry lock for its key while doing so; async workers never wait on it.
    async fn resolve_client(
        &self,
        options: &ClientOptions,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Client, DownloadError> {
        let cache = Arc::clone(&self.cache);
        let options = options.clone();
        let lookup = tokio::task::spawn_blocking(move || cache.get_or_create(&options));

        let joined = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            joined = lookup => joined,
        };
        match joined {
            Ok(client) => Ok(client?),
            Err(join_error) => match join_error.try_into_panic() {
                Ok(payload) => std::panic::resume_unwind(payload),
                // The runtime is shutting down.
                Err(_) => Err(DownloadError::cancelled(url)),
            },
        }
    }
}

/// Limits `send` to `timeout_secs`; `0` means no limit. `None` when the limit elapsed.
async fn with_request_timeout<F: Future>(send: F, timeout_secs: u64) -> Option<F::Output> {
    if timeout_secs == 0 {
        return Some(send.await);
    }
    tokio::time::timeout(Duration::from_secs(timeout_secs), send)
        .await
        .ok()
}

fn validate_request(request: &DownloadRequest) -> Result<Url, DownloadError> {
    if request.url.trim().is_empty() {
        return Err(DownloadError::invalid_argument("url must not be empty"));
    }
    if request.destination_path.as_os_str().is_empty() {
        return Err(DownloadError::invalid_argument(
            "destination path must not be empty",
        ));
    }
    let url = Url::parse(request.url.trim()).map_err(|e| {
        DownloadError::invalid_argument(format!("invalid url {}: {e}", request.url))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DownloadError::invalid_argument(format!(
            "unsupported url scheme {}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn check_status(
    response: Response,
    url: &str,
    throw_on_error_response: bool,
) -> Result<Response, DownloadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if throw_on_error_response {
        return Err(DownloadError::http_status(url, status.as_u16()));
    }
    debug!(status = status.as_u16(), "saving error response body");
    Ok(response)
}

async fn create_new_file(path: &Path) -> Result<File, DownloadError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))
}

/// Copies the body chunk by chunk; each read and write observes `cancel`.
async fn stream_to_file(
    file: File,
    response: Response,
    url: &str,
    file_path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else {
            break;
        };
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            result = writer.write_all(&chunk) => {
                result.map_err(|e| DownloadError::io(file_path, e))?;
            }
        }

        bytes_written += chunk.len() as u64;
    }

    flush_to_disk(&mut writer, url, file_path, cancel).await?;
    Ok(bytes_written)
}

/// Writes back whatever the buffer still holds, observing `cancel`.
async fn flush_to_disk(
    writer: &mut BufWriter<File>,
    url: &str,
    file_path: &Path,
    cancel: &CancellationToken,
) -> Result<(), DownloadError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(DownloadError::cancelled(url)),
        result = writer.flush() => result.map_err(|e| DownloadError::io(file_path, e)),
    }
}
