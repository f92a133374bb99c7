mod memory;

pub use memory::{CheckHistory, MemoryStore};

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity under which a URL is registered. Scopes visibility, status
/// records and alerts; the same URL monitored by two owners is tracked as
/// two independent entries.
pub type OwnerId = i64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("storage backend error: {reason}")]
    Backend { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStatus {
    Pending,
    Online,
    Offline,
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Current state of one monitored URL. `status` stays `Pending` until the
/// first check completes; the optional fields are absent until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlState {
    pub status: UrlStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status_code: Option<u16>,
    pub added_at: DateTime<Utc>,
}

impl UrlState {
    pub fn pending(added_at: DateTime<Utc>) -> Self {
        Self {
            status: UrlStatus::Pending,
            last_check: None,
            response_time_secs: None,
            last_status_code: None,
            added_at,
        }
    }
}

/// One completed probe, appended per (owner, URL). Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub status_code: u16,
    pub response_time_secs: f64,
}

/// Windowed uptime summary. All-zero when no checks fall in the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeStats {
    pub uptime_percentage: f64,
    pub total_checks: usize,
    pub successful_checks: usize,
    pub failed_checks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_time_secs: Option<f64>,
    pub window_hours: u32,
}

impl UptimeStats {
    pub fn empty(window_hours: u32) -> Self {
        Self {
            uptime_percentage: 0.0,
            total_checks: 0,
            successful_checks: 0,
            failed_checks: 0,
            avg_response_time_secs: None,
            window_hours,
        }
    }
}

/// Read-side listing entry: one (owner, URL) pair with its current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredUrl {
    pub owner_id: OwnerId,
    pub url: String,
    pub state: UrlState,
}

/// Durable mapping from (owner, URL) to monitoring state and check history.
///
/// Implementations must support concurrent reads and writes; updates to a
/// single key are atomic, cross-key atomicity is not required. Writers
/// racing on the same key resolve last-write-wins.
#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Returns false (without mutating) when the URL is already registered
    /// for that owner.
    async fn add_url(&self, owner: OwnerId, url: &str) -> Result<bool, StoreError>;

    /// Returns false when the URL was not registered for that owner.
    async fn remove_url(&self, owner: OwnerId, url: &str) -> Result<bool, StoreError>;

    async fn urls(&self, owner: OwnerId) -> Result<HashMap<String, UrlState>, StoreError>;

    /// Every (URL, owner) pair across all owners, one entry per pair.
    async fn all_urls(&self) -> Result<Vec<(String, OwnerId)>, StoreError>;

    /// Atomically updates the current-state fields and appends a
    /// [`CheckRecord`]. Unknown keys are ignored (the URL may have been
    /// removed while a probe was in flight).
    async fn update_status(
        &self,
        url: &str,
        owner: OwnerId,
        status_code: u16,
        response_time_secs: f64,
        success: bool,
    ) -> Result<(), StoreError>;

    async fn uptime_stats(
        &self,
        url: &str,
        owner: OwnerId,
        window_hours: u32,
    ) -> Result<UptimeStats, StoreError>;

    /// Full listing for status surfaces and metrics.
    async fn snapshot(&self) -> Result<Vec<MonitoredUrl>, StoreError>;
}

/// Normalize a raw user-supplied URL: scheme-less input gets `https://`
/// prepended, then the result must parse as an http(s) URL.
pub fn normalize_url(raw: &str) -> Result<String, StoreError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&candidate).map_err(|e| StoreError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(StoreError::InvalidUrl {
            url: raw.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }

    Ok(candidate)
}

/// Uptime over the records within the trailing window, as
/// `successful / total * 100`. Defined (all zeros) for an empty window.
pub(crate) fn compute_uptime(
    records: &[CheckRecord],
    window_hours: u32,
    now: DateTime<Utc>,
) -> UptimeStats {
    let cutoff = now - ChronoDuration::hours(i64::from(window_hours));
    let in_window: Vec<&CheckRecord> = records.iter().filter(|r| r.timestamp >= cutoff).collect();

    if in_window.is_empty() {
        return UptimeStats::empty(window_hours);
    }

    let total = in_window.len();
    let successful = in_window.iter().filter(|r| r.success).count();
    let avg = in_window.iter().map(|r| r.response_time_secs).sum::<f64>() / total as f64;

    UptimeStats {
        uptime_percentage: successful as f64 / total as f64 * 100.0,
        total_checks: total,
        successful_checks: successful,
        failed_checks: total - successful,
        avg_response_time_secs: Some(avg),
        window_hours,
    }
}
