use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ping interval must be a positive number of seconds")]
    ZeroPingInterval,
    #[error("request timeout must be a positive number of seconds")]
    ZeroRequestTimeout,
    #[error("history limit must be positive")]
    ZeroHistoryLimit,
}

/// Configuration for the monitoring scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between ping cycles (default: 60s).
    pub ping_interval: Duration,
    /// Total HTTP timeout for a single probe (default: 30s).
    pub request_timeout: Duration,
    /// Maximum number of check records retained per URL (ring buffer capacity).
    pub history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            // 3 days of history at the default 60s cadence; the rolling 24h
            // uptime window fits with margin at any interval >= 20s.
            history_limit: 4320,
        }
    }
}

impl MonitorConfig {
    pub fn with_ping_interval_secs(mut self, secs: u64) -> Self {
        self.ping_interval = Duration::from_secs(secs);
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Rejects zero-valued settings. A scheduler is never constructed from
    /// an invalid config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_interval.is_zero() {
            return Err(ConfigError::ZeroPingInterval);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.history_limit == 0 {
            return Err(ConfigError::ZeroHistoryLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_interval, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builders_override_defaults() {
        let config = MonitorConfig::default()
            .with_ping_interval_secs(10)
            .with_request_timeout_secs(5)
            .with_history_limit(100);
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn zero_ping_interval_is_rejected() {
        let config = MonitorConfig::default().with_ping_interval_secs(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroPingInterval)
        ));
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let config = MonitorConfig::default().with_request_timeout_secs(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroRequestTimeout)
        ));
    }

    #[test]
    fn zero_history_limit_is_rejected() {
        let config = MonitorConfig::default().with_history_limit(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroHistoryLimit)
        ));
    }
}
