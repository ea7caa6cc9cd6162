//! Transport failures surface as errors carrying their root cause.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use http_download_file::{
    CancellationToken, ClientCache, ClientOptions, DownloadError, DownloadRequest, Downloader,
};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::raw_server::{
    AfterPrefix, spawn_partial_body_server, spawn_trickle_body_server,
};

fn downloader() -> Downloader {
    Downloader::new(Arc::new(ClientCache::default()))
}

#[tokio::test]
async fn test_connection_dropped_mid_body_is_network_error() {
    let addr = spawn_partial_body_server(1_000, vec![b'y'; 100], AfterPrefix::Drop).await;
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("truncated.bin");

    let result = downloader()
        .download(
            &DownloadRequest::new(format!("http://{addr}/truncated.bin"), &destination),
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(error @ DownloadError::Network { .. }) => {
            assert!(error.source().is_some(), "root cause must be preserved");
        }
        other => panic!("Expected Network error, got: {other:?}"),
    }
    assert!(destination.exists(), "partial file is left on disk");
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Bind then drop to obtain a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("refused.bin");

    let result = downloader()
        .download(
            &DownloadRequest::new(format!("http://127.0.0.1:{port}/file"), &destination),
            &CancellationToken::new(),
        )
        .await;

    assert!(
        matches!(result, Err(DownloadError::Network { .. })),
        "Expected Network error, got: {result:?}"
    );
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_slow_server_hits_connection_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let request = DownloadRequest::new(
        format!("{}/slow", mock_server.uri()),
        temp_dir.path().join("slow.txt"),
    )
    .with_options(ClientOptions {
        connection_timeout_seconds: 1,
        ..ClientOptions::default()
    });

    let result = downloader()
        .download(&request, &CancellationToken::new())
        .await;
    match result {
        Err(DownloadError::Timeout { after, .. }) => assert_eq!(after, Duration::from_secs(1)),
        other => panic!("Expected Timeout, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_body_outlasting_connection_timeout_completes() {
    // Headers arrive at once; the body takes about 2.5s against a 1s limit.
    let addr = spawn_trickle_body_server(b"hello".to_vec(), Duration::from_millis(500)).await;
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("slow-body.txt");

    let request = DownloadRequest::new(format!("http://{addr}/f"), &destination).with_options(
        ClientOptions {
            connection_timeout_seconds: 1,
            ..ClientOptions::default()
        },
    );

    let result = downloader()
        .download(&request, &CancellationToken::new())
        .await;

    assert!(result.is_ok(), "Expected Ok, got: {result:?}");
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "hello");
}

#[tokio::test]
async fn test_server_error_is_http_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let result = downloader()
        .download(
            &DownloadRequest::new(
                format!("{}/busy", mock_server.uri()),
                temp_dir.path().join("busy"),
            ),
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 503),
        other => panic!("Expected HttpStatus error, got: {other:?}"),
    }
}
