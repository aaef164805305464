//! Configuration module
//!
//! Console connection settings and polling intervals.

use std::time::Duration;

/// How often `pipeline watch` refetches the pipeline and repositories
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(25);

/// How often the promotion panel refreshes the source events
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Console base URL (e.g., "http://localhost:8080")
    pub console_url: String,

    /// Interval between pipeline refreshes
    pub poll_interval: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(console_url: impl Into<String>) -> Self {
        Self {
            console_url: console_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval = Duration::from_secs(secs);
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.console_url.is_empty() {
            anyhow::bail!("console_url cannot be empty");
        }

        if !self.console_url.starts_with("http://") && !self.console_url.starts_with("https://") {
            anyhow::bail!("console_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
