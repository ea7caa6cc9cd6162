//! Cancellation while a transfer is in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http_download_file::{CancellationToken, ClientCache, DownloadError, DownloadRequest, Downloader};
use tempfile::TempDir;

use crate::support::raw_server::{AfterPrefix, spawn_partial_body_server};

#[tokio::test]
async fn test_cancel_mid_transfer_returns_cancelled_and_keeps_partial_file() {
    let addr = spawn_partial_body_server(1_000_000, vec![b'x'; 64 * 1024], AfterPrefix::Stall).await;
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("big.bin");

    let downloader = Downloader::new(Arc::new(ClientCache::default()));
    let request = DownloadRequest::new(format!("http://{addr}/big.bin"), &destination);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watched = destination.clone();
    tokio::spawn(async move {
        // Cancel once bytes have reached the disk.
        for _ in 0..200 {
            if std::fs::metadata(&watched).is_ok_and(|m| m.len() > 0) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        trigger.cancel();
    });

    let started = Instant::now();
    let result = downloader.download(&request, &cancel).await;

    assert!(
        matches!(result, Err(DownloadError::Cancelled { .. })),
        "Expected Cancelled, got: {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(10), "cancellation must be prompt");
    assert!(destination.exists(), "partial file is left on disk");
}

#[tokio::test]
async fn test_cancel_does_not_poison_cache_for_next_download() {
    let addr = spawn_partial_body_server(10, b"0123456789".to_vec(), AfterPrefix::Stall).await;
    let temp_dir = TempDir::new().unwrap();

    let cache = Arc::new(ClientCache::default());
    let downloader = Downloader::new(Arc::clone(&cache));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let cancelled = downloader
        .download(
            &DownloadRequest::new(format!("http://{addr}/a"), temp_dir.path().join("a")),
            &cancel,
        )
        .await;
    assert!(matches!(cancelled, Err(DownloadError::Cancelled { .. })));

    let result = downloader
        .download(
            &DownloadRequest::new(format!("http://{addr}/b"), temp_dir.path().join("b")),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(std::fs::read(&result.file_path).unwrap(), b"0123456789");
}
