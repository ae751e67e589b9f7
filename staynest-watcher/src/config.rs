/// Configuration management for the cascade watcher
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `WATCHER_CHANGE_FEED`: `enabled` or `disabled` (default: enabled)
/// - `SWEEP_INTERVAL_SECS`: Periodic sweep interval (default: 300)
/// - `SWEEP_PAGE_SIZE`: Membership scan page size (default: 100)
/// - `RESUBSCRIBE_BACKOFF_BASE_MS`: First resubscribe delay (default: 500)
/// - `RESUBSCRIBE_BACKOFF_CAP_SECS`: Resubscribe delay ceiling (default: 30)
/// - `RUST_LOG`: Log level (default: info)

use std::env;
use std::time::Duration;

use crate::watcher::WatcherConfig;

/// Complete watcher configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Whether to subscribe to the Identity delete feed
    pub change_feed_enabled: bool,

    /// Interval between scheduled sweeps
    pub sweep_interval: Duration,

    /// Membership scan page size for sweeps
    pub sweep_page_size: u32,

    /// First resubscribe delay after losing the feed
    pub backoff_base: Duration,

    /// Upper bound for the resubscribe delay
    pub backoff_cap: Duration,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing, or if a numeric
    /// variable or `WATCHER_CHANGE_FEED` has an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let change_feed_enabled = match env::var("WATCHER_CHANGE_FEED")
            .unwrap_or_else(|_| "enabled".to_string())
            .as_str()
        {
            "enabled" => true,
            "disabled" => false,
            other => anyhow::bail!("WATCHER_CHANGE_FEED must be 'enabled' or 'disabled', got '{other}'"),
        };

        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()?;

        let sweep_page_size = env::var("SWEEP_PAGE_SIZE")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()?;

        let backoff_base_ms = env::var("RESUBSCRIBE_BACKOFF_BASE_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<u64>()?;

        let backoff_cap_secs = env::var("RESUBSCRIBE_BACKOFF_CAP_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()?;

        Ok(Self {
            database_url,
            change_feed_enabled,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            sweep_page_size,
            backoff_base: Duration::from_millis(backoff_base_ms),
            backoff_cap: Duration::from_secs(backoff_cap_secs),
        })
    }

    /// The slice of this configuration the watcher loop needs
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            sweep_page_size: self.sweep_page_size,
            backoff_base: self.backoff_base,
            backoff_cap: self.backoff_cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_config_slice() {
        let config = Config {
            database_url: "postgresql://localhost/test".to_string(),
            change_feed_enabled: true,
            sweep_interval: Duration::from_secs(300),
            sweep_page_size: 50,
            backoff_base: Duration::from_millis(250),
            backoff_cap: Duration::from_secs(10),
        };

        let watcher = config.watcher_config();
        assert_eq!(watcher.sweep_page_size, 50);
        assert_eq!(watcher.backoff_base, Duration::from_millis(250));
        assert_eq!(watcher.backoff_cap, Duration::from_secs(10));
    }
}
