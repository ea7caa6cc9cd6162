//! Process-wide cache of built HTTP clients.
//!
//! This module provides the [`ClientCache`] struct which maps a
//! [`ClientCacheKey`] to a previously built `reqwest::Client`, so repeated
//! downloads with the same connection settings reuse one connection pool.
//!
//! # Expiration
//!
//! Entries use a sliding window: every hit refreshes the entry, and an entry
//! that has not been used for a full window is evicted. Eviction happens on
//! access, on [`ClientCache::sweep_expired`], and periodically once
//! [`ClientCache::initialize`] has started the background sweeper.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use http_download_file::download::{ClientCache, ClientOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ClientCache::default());
//! cache.initialize();
//!
//! let client = cache.get_or_create(&ClientOptions::default())?;
//! // Same options (token aside) return the same pooled client.
//! let again = cache.get_or_create(&ClientOptions::default())?;
//! # let _ = (client, again);
//!
//! cache.shutdown();
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::constants::{DEFAULT_SLIDING_EXPIRATION, DEFAULT_SWEEP_INTERVAL};
use super::error::ConfigurationError;
use super::factory::ClientFactory;
use super::options::{ClientCacheKey, ClientOptions};

/// Timing settings for a [`ClientCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCacheConfig {
    /// Inactivity window after which an entry is evicted.
    pub sliding_expiration: Duration,
    /// Interval between background sweeps.
    pub sweep_interval: Duration,
}

impl Default for ClientCacheConfig {
    fn default() -> Self {
        Self {
            sliding_expiration: DEFAULT_SLIDING_EXPIRATION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// A cached client and the time it was last handed out.
#[derive(Debug)]
struct CachedClient {
    client: Client,
    last_access: Instant,
}

impl CachedClient {
    fn new(client: Client, now: Instant) -> Self {
        Self {
            client,
            last_access: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_access) >= window
    }
}

/// Sliding-expiration cache of HTTP clients keyed by connection settings.
///
/// `ClientCache` is `Send + Sync` and meant to be shared through `Arc`.
/// Lookups for different keys run concurrently; lookups for the same key are
/// serialized on the map shard, so a miss builds exactly one client.
///
/// Dropping a client from the cache releases its connection pool once the
/// last in-flight request holding a clone completes.
#[derive(Debug)]
pub struct ClientCache {
    factory: ClientFactory,
    config: ClientCacheConfig,
    entries: DashMap<ClientCacheKey, CachedClient>,
    /// Clients built by the factory so far.
    builds: AtomicU64,
    /// Stops the background sweeper; `None` while it is not running.
    sweeper: Mutex<Option<CancellationToken>>,
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new(ClientFactory::default(), ClientCacheConfig::default())
    }
}

impl ClientCache {
    /// Creates an empty cache that builds clients with `factory`.
    #[must_use]
    pub fn new(factory: ClientFactory, config: ClientCacheConfig) -> Self {
        Self {
            factory,
            config,
            entries: DashMap::new(),
            builds: AtomicU64::new(0),
            sweeper: Mutex::new(None),
        }
    }

    /// Timing settings in effect.
    #[must_use]
    pub fn config(&self) -> ClientCacheConfig {
        self.config
    }

    /// Returns the cached client for `options`, building and caching one on a miss.
    ///
    /// A hit refreshes the entry's sliding window. An entry found expired is
    /// replaced by a freshly built client.
    ///
    /// A miss holds the map shard lock while the factory runs, which may read
    /// certificate files or scan the certificate store. Other keys on the same
    /// shard wait for it. Call this from blocking context (as
    /// [`Downloader`](super::Downloader) does) rather than on an async worker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when a client has to be built and the
    /// options cannot produce one. Nothing is cached in that case.
    #[instrument(level = "debug", skip_all)]
    pub fn get_or_create(&self, options: &ClientOptions) -> Result<Client, ConfigurationError> {
        let now = Instant::now();
        let window = self.config.sliding_expiration;

        // The entry guard holds the shard lock for this key, so concurrent
        // misses on the same key wait here instead of building twice.
        match self.entries.entry(options.cache_key()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now, window) {
                    debug!("cached client expired; rebuilding");
                    let client = self.build(options)?;
                    occupied.insert(CachedClient::new(client.clone(), now));
                    Ok(client)
                } else {
                    debug!("client cache hit");
                    let cached = occupied.get_mut();
                    cached.last_access = now;
                    Ok(cached.client.clone())
                }
            }
            Entry::Vacant(vacant) => {
                debug!("client cache miss; building client");
                let client = self.build(options)?;
                vacant.insert(CachedClient::new(client.clone(), now));
                Ok(client)
            }
        }
    }

    fn build(&self, options: &ClientOptions) -> Result<Client, ConfigurationError> {
        let client = self.factory.build(options)?;
        self.builds.fetch_add(1, Ordering::Relaxed);
        Ok(client)
    }

    /// Number of clients built since the cache was created. Failed builds are not counted.
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Returns true if a live (unexpired) client is cached for `options`.
    #[must_use]
    pub fn contains(&self, options: &ClientOptions) -> bool {
        let now = Instant::now();
        self.entries
            .get(&options.cache_key())
            .is_some_and(|cached| !cached.is_expired(now, self.config.sliding_expiration))
    }

    /// Number of cached entries, including expired entries not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts every entry idle for at least the sliding window.
    ///
    /// Returns the number of evicted entries.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let window = self.config.sliding_expiration;
        let before = self.entries.len();
        self.entries.retain(|_, cached| !cached.is_expired(now, window));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "evicted idle clients");
        }
        evicted
    }

    /// Removes all entries immediately.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count, "client cache cleared");
    }

    /// Starts the background sweeper on the current tokio runtime.
    ///
    /// Calling it again while the sweeper runs is a no-op. The sweeper holds
    /// only a weak reference and exits once the cache is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn initialize(self: &Arc<Self>) {
        let Ok(mut sweeper) = self.sweeper.lock() else {
            warn!("client cache sweeper lock poisoned; not starting sweeper");
            return;
        };
        if sweeper.is_some() {
            return;
        }

        let token = CancellationToken::new();
        *sweeper = Some(token.clone());
        drop(sweeper);

        let weak = Arc::downgrade(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(run_sweeper(weak, interval, token));
        info!(
            interval_secs = interval.as_secs(),
            window_secs = self.config.sliding_expiration.as_secs(),
            "client cache initialized"
        );
    }

    /// Stops the background sweeper and removes all entries.
    pub fn shutdown(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock()
            && let Some(token) = sweeper.take()
        {
            token.cancel();
        }
        self.clear();
        info!("client cache shut down");
    }
}

async fn run_sweeper(cache: Weak<ClientCache>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                // Sweeping waits on shard locks that a certificate load may hold.
                if tokio::task::spawn_blocking(move || cache.sweep_expired()).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("client cache sweeper stopped");
}

impl Drop for ClientCache {
    fn drop(&mut self) {
        if let Ok(mut sweeper) = self.sweeper.lock()
            && let Some(token) = sweeper.take()
        {
            token.cancel();
        }
    }
}
