#![forbid(unsafe_code)]

pub mod alert;
pub mod config;
pub mod monitor;
pub mod prober;
pub mod store;

pub use alert::{
    notification_channel, AlertDispatcher, Notification, WebhookConfig, WebhookPayload,
};
pub use config::{ConfigError, MonitorConfig};
pub use monitor::{MonitorState, MonitoringStatus, Scheduler};
pub use prober::{HttpProber, PingResult, Prober};
pub use store::{
    normalize_url, CheckRecord, MemoryStore, MonitoredUrl, OwnerId, StoreError, UptimeStats,
    UrlState, UrlStatus, UrlStore,
};
