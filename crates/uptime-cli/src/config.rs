//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//!
//! [monitor]
//! ping_interval_secs = 60
//! request_timeout_secs = 30
//!
//! [[webhook]]
//! url = "https://hooks.example.com/uptime-alerts"
//! events = ["url_down"]
//!
//! [[url]]
//! owner = 1691680798
//! url = "https://example.com"
//!
//! [[url]]
//! owner = 1691680798
//! url = "status.internal.example.com"
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use uptime_core::{normalize_url, MonitorConfig, OwnerId, WebhookConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub monitor: MonitorSettings,

    #[serde(default)]
    pub webhook: Vec<WebhookConfig>,

    /// Seed URLs registered at startup, one entry per (owner, URL).
    #[serde(default, rename = "url")]
    pub urls: Vec<UrlDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
        }
    }
}

fn default_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_ping_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    4320
}

impl MonitorSettings {
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig::default()
            .with_ping_interval_secs(self.ping_interval_secs)
            .with_request_timeout_secs(self.request_timeout_secs)
            .with_history_limit(self.history_limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlDef {
    pub owner: OwnerId,
    pub url: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        self.monitor
            .to_monitor_config()
            .validate()
            .map_err(|e| format!("Invalid [monitor] section: {}", e))?;

        for (i, wh) in self.webhook.iter().enumerate() {
            url::Url::parse(&wh.url)
                .map_err(|e| format!("Invalid webhook URL at index {}: {} ({})", i, wh.url, e))?;
        }

        for (i, def) in self.urls.iter().enumerate() {
            normalize_url(&def.url).map_err(|e| {
                format!("Invalid seed URL at index {} for owner {}: {}", i, def.owner, e)
            })?;
        }

        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }
}
