//! CLI entry point for the download-file tool.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use http_download_file::{CancellationToken, ClientCache, Downloader};
use tracing::{debug, error, info, warn};

mod app_config;
mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(url = %args.url, path = %args.path.display(), "CLI arguments parsed");

    let config = app_config::load_config(args.config.as_deref())?;
    let cache = Arc::new(ClientCache::new(
        config.client_factory(),
        config.cache_config(),
    ));
    cache.initialize();

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling download");
            signal_token.cancel();
        }
    });

    let downloader = Downloader::new(Arc::clone(&cache));
    let outcome = downloader.download(&args.download_request(), &cancel).await;
    cache.shutdown();

    match outcome {
        Ok(result) => {
            info!(path = %result.file_path.display(), "saved");
            println!("{}", serde_json::to_string(&result)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "download failed");
            Err(e.into())
        }
    }
}
