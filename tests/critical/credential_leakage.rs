//! Credentials stay out of errors, debug output, and unrelated requests.

use std::sync::Arc;

use http_download_file::{
    CancellationToken, ClientCache, ClientOptions, DownloadError, DownloadRequest, Downloader,
};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_options_debug_does_not_contain_secrets() {
    let options = ClientOptions {
        token: "tok-secret-value".into(),
        ..ClientOptions::basic("alice", "pw-secret-value")
    };
    let debug = format!("{options:?}");
    assert!(!debug.contains("pw-secret-value"), "{debug}");
    assert!(!debug.contains("tok-secret-value"), "{debug}");
}

#[tokio::test]
async fn test_http_error_message_does_not_contain_credentials() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let request = DownloadRequest::new(
        format!("{}/private", mock_server.uri()),
        temp_dir.path().join("private"),
    )
    .with_options(ClientOptions::oauth("tok-secret-value"));

    let error = Downloader::new(Arc::new(ClientCache::default()))
        .download(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, DownloadError::HttpStatus { status: 401, .. }));
    assert!(!error.to_string().contains("tok-secret-value"));
}

#[tokio::test]
async fn test_token_of_previous_call_not_sent_on_shared_client() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(ClientCache::default());
    let downloader = Downloader::new(Arc::clone(&cache));
    let cancel = CancellationToken::new();

    downloader
        .download(
            &DownloadRequest::new(
                format!("{}/one", mock_server.uri()),
                temp_dir.path().join("one"),
            )
            .with_options(ClientOptions::oauth("first-token")),
            &cancel,
        )
        .await
        .unwrap();
    downloader
        .download(
            &DownloadRequest::new(
                format!("{}/two", mock_server.uri()),
                temp_dir.path().join("two"),
            )
            .with_options(ClientOptions::oauth("second-token")),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(cache.len(), 1, "token is not part of the cache key");
    let requests = mock_server.received_requests().await.unwrap();
    let auth_of = |p: &str| {
        requests
            .iter()
            .find(|r| r.url.path() == p)
            .and_then(|r| r.headers.get("authorization"))
            .map(|v| v.to_str().unwrap().to_string())
    };
    assert_eq!(auth_of("/one").as_deref(), Some("Bearer first-token"));
    assert_eq!(auth_of("/two").as_deref(), Some("Bearer second-token"));
}
