mod http;

pub use http::HttpProber;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single HTTP health check.
///
/// Probing never fails as far as callers are concerned: timeouts, DNS
/// failures, refused connections and bad responses are all folded into
/// `success` / `error` instead of being raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResult {
    pub url: String,
    /// HTTP status code; 0 when the request never reached a server.
    pub status_code: u16,
    /// Wall-clock seconds from request dispatch to resolution, populated
    /// on the success, timeout and error paths alike.
    pub response_time_secs: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Taken at request start.
    pub timestamp: DateTime<Utc>,
}

/// A check counts as up when a response arrived with a 2xx or 3xx code.
pub fn is_success_status(code: u16) -> bool {
    (200..400).contains(&code)
}

/// Trait for executing a single health check against a URL.
///
/// Implementations handle the HTTP request, timeout bounding, and result
/// classification. The trait is object-safe and Send + Sync for use across
/// async tasks.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> PingResult;
}
