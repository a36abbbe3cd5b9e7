//! Feed pipeline configuration.

use std::time::Duration;

/// Limits and cadence for download, parsing and the refresh scheduler.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Hard total timeout for one feed download.
    pub download_timeout: Duration,
    /// Wire-size cap; downloads abort once the body exceeds it.
    pub max_bytes: usize,
    /// Offer-count cap per feed.
    pub max_products: usize,
    /// Age beyond which a feed becomes eligible for automatic refresh.
    pub staleness: Duration,
    /// Pause between scheduler check cycles.
    pub check_interval: Duration,
    /// Delay before the first check cycle after startup.
    pub initial_delay: Duration,
    /// Concurrent project refreshes.
    pub workers: usize,
    /// Attempts per refresh before giving up until the next cycle.
    pub retry_count: u32,
    /// Gap between attempts.
    pub retry_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            download_timeout: Duration::from_secs(300),
            max_bytes: 500 * 1024 * 1024,
            max_products: 1_000_000,
            staleness: Duration::from_secs(4 * 3600),
            check_interval: Duration::from_secs(15 * 60),
            initial_delay: Duration::from_secs(60),
            workers: 5,
            retry_count: 3,
            retry_delay: Duration::from_secs(60),
        }
    }
}

impl FeedConfig {
    /// Build `FeedConfig` from environment variables.
    ///
    /// Recognized vars (all optional):
    /// - FEED_TIMEOUT_SECS (default: 300)
    /// - FEED_MAX_BYTES (default: 524288000)
    /// - FEED_MAX_PRODUCTS (default: 1000000)
    /// - FEED_STALENESS_SECS (default: 14400)
    /// - FEED_CHECK_INTERVAL_SECS (default: 900)
    /// - FEED_WORKERS (default: 5)
    pub fn from_env() -> Self {
        use std::env;
        let secs = |name: &str, default: u64| {
            env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        let defaults = Self::default();
        Self {
            download_timeout: Duration::from_secs(secs("FEED_TIMEOUT_SECS", 300)),
            max_bytes: env::var("FEED_MAX_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_bytes),
            max_products: env::var("FEED_MAX_PRODUCTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_products),
            staleness: Duration::from_secs(secs("FEED_STALENESS_SECS", 14_400)),
            check_interval: Duration::from_secs(secs("FEED_CHECK_INTERVAL_SECS", 900)),
            initial_delay: defaults.initial_delay,
            workers: env::var("FEED_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.workers),
            retry_count: defaults.retry_count,
            retry_delay: defaults.retry_delay,
        }
    }
}
