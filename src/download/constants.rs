//! Constants for the download module (timeouts, cache windows, redirects).

use std::time::Duration;

/// Default request timeout applied to built clients (30 seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Inactivity window after which a cached client is evicted (1 hour).
pub const DEFAULT_SLIDING_EXPIRATION: Duration = Duration::from_secs(3600);

/// How often the background sweeper looks for expired clients.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Maximum redirect hops followed when redirects are enabled.
pub const MAX_REDIRECTS: usize = 50;
