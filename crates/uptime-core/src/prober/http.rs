use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

use super::{is_success_status, PingResult, Prober};

/// HTTP-based prober with connection pooling. Issues a single GET per check,
/// following redirects, bounded by the client's total timeout.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Self::build_client(timeout),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &crate::config::MonitorConfig) -> Self {
        Self::new(config.request_timeout)
    }

    pub fn build_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(20)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client")
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> PingResult {
        let timestamp = Utc::now();
        let start = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => {
                let elapsed = start.elapsed().as_secs_f64();
                let status_code = response.status().as_u16();
                let success = is_success_status(status_code);
                debug!(url, status_code, elapsed_secs = elapsed, "Probe completed");
                PingResult {
                    url: url.to_string(),
                    status_code,
                    response_time_secs: elapsed,
                    success,
                    error: None,
                    timestamp,
                }
            }
            Err(e) if e.is_timeout() => {
                let elapsed = start.elapsed().as_secs_f64();
                warn!(url, elapsed_secs = elapsed, "Probe timed out");
                PingResult {
                    url: url.to_string(),
                    status_code: 408,
                    response_time_secs: elapsed,
                    success: false,
                    error: Some("Request timeout".to_string()),
                    timestamp,
                }
            }
            Err(e) => {
                let elapsed = start.elapsed().as_secs_f64();
                warn!(url, error = %e, "Probe failed");
                PingResult {
                    url: url.to_string(),
                    status_code: 0,
                    response_time_secs: elapsed,
                    success: false,
                    error: Some(e.to_string()),
                    timestamp,
                }
            }
        }
    }
}
