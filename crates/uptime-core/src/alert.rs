//! Failure alert delivery.
//!
//! The scheduler pushes a [`Notification`] for every failed check through an
//! mpsc channel. The [`AlertDispatcher`] reads from that channel and POSTs
//! JSON payloads to all configured webhook endpoints, from where the chat
//! layer (or any other notifier) renders and forwards them. Delivery
//! problems are logged and never reach the monitoring loop.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::prober::PingResult;
use crate::store::OwnerId;

/// Configuration for a single webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// The URL to POST payloads to.
    pub url: String,

    /// Which notification types to deliver. Empty means all.
    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_webhook_retries")]
    pub max_retries: u32,

    /// Optional HMAC-SHA256 signing secret for `X-Uptime-Signature-256`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

fn default_webhook_retries() -> u32 {
    2
}

impl WebhookConfig {
    pub fn accepts(&self, notification_type: &str) -> bool {
        if self.events.is_empty() {
            return true;
        }
        self.events.iter().any(|e| e == notification_type)
    }
}

/// A failed check routed to the owning admin's notification endpoints.
#[derive(Debug, Clone)]
pub struct Notification {
    pub owner_id: OwnerId,
    pub result: PingResult,
}

impl Notification {
    pub fn notification_type(&self) -> &'static str {
        "url_down"
    }
}

/// The JSON envelope POSTed to webhook endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub version: u8,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub owner_id: OwnerId,
    pub data: serde_json::Value,
}

impl WebhookPayload {
    pub fn from_notification(notification: &Notification) -> Self {
        let result = &notification.result;
        Self {
            version: 1,
            id: Uuid::new_v4().to_string(),
            timestamp: result.timestamp,
            notification_type: notification.notification_type().to_string(),
            owner_id: notification.owner_id,
            data: serde_json::json!({
                "url": result.url,
                "status_code": result.status_code,
                "response_time_secs": result.response_time_secs,
                "error": result.error,
            }),
        }
    }
}

/// Asynchronous alert dispatcher.
///
/// Spawned as a background tokio task, it reads from the notification
/// channel and POSTs payloads to all configured webhook endpoints.
pub struct AlertDispatcher {
    rx: mpsc::UnboundedReceiver<Notification>,
    webhooks: Vec<WebhookConfig>,
    client: Client,
}

impl AlertDispatcher {
    pub fn new(
        rx: mpsc::UnboundedReceiver<Notification>,
        webhooks: Vec<WebhookConfig>,
        client: Client,
    ) -> Self {
        Self {
            rx,
            webhooks,
            client,
        }
    }

    /// Run the dispatcher loop. Returns when all senders are dropped.
    pub async fn run(mut self) {
        debug!(
            webhook_count = self.webhooks.len(),
            "Alert dispatcher started"
        );

        while let Some(notification) = self.rx.recv().await {
            let payload = WebhookPayload::from_notification(&notification);
            let notification_type = notification.notification_type();

            for wh in &self.webhooks {
                if !wh.accepts(notification_type) {
                    continue;
                }

                let json_bytes = match serde_json::to_vec(&payload) {
                    Ok(b) => b,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize alert payload");
                        continue;
                    }
                };

                let timeout = Duration::from_millis(wh.timeout_ms);

                if let Err(e) = deliver(
                    &self.client,
                    &wh.url,
                    &json_bytes,
                    wh.secret.as_deref(),
                    timeout,
                    wh.max_retries,
                )
                .await
                {
                    warn!(
                        url = %wh.url,
                        owner_id = notification.owner_id,
                        error = %e,
                        "Alert delivery failed"
                    );
                } else {
                    debug!(url = %wh.url, owner_id = notification.owner_id, "Alert delivered");
                }
            }
        }

        debug!("Alert dispatcher shutting down");
    }
}

pub fn notification_channel() -> (
    mpsc::UnboundedSender<Notification>,
    mpsc::UnboundedReceiver<Notification>,
) {
    mpsc::unbounded_channel()
}

async fn deliver(
    client: &Client,
    url: &str,
    body: &[u8],
    secret: Option<&str>,
    timeout: Duration,
    max_retries: u32,
) -> Result<(), String> {
    let mut last_error = String::new();

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
            tokio::time::sleep(backoff).await;
        }

        let mut req = client
            .post(url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "uptime-monitor/0.1")
            .timeout(timeout)
            .body(body.to_vec());

        if let Some(secret) = secret {
            let signature = sign_payload(body, secret);
            req = req.header("X-Uptime-Signature-256", format!("sha256={}", signature));
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => {
                let status = resp.status();
                last_error = format!("HTTP {} from {}", status, url);
                if status.as_u16() >= 400 && status.as_u16() < 500 && status.as_u16() != 429 {
                    return Err(last_error);
                }
            }
            Err(e) => {
                last_error = format!("Request to {} failed: {}", url, e);
            }
        }
    }

    Err(last_error)
}

fn sign_payload(body: &[u8], secret: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
