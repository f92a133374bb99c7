use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::alert::Notification;
use crate::config::{ConfigError, MonitorConfig};
use crate::monitor::state::{MonitorState, MonitoringStatus};
use crate::prober::{PingResult, Prober};
use crate::store::{
    normalize_url, MonitoredUrl, OwnerId, StoreError, UptimeStats, UrlState, UrlStore,
};

/// Owns the periodic ping cycle. Holds no per-URL state of its own; all
/// monitoring data lives in the store, and the scheduler only carries its
/// running flag, configuration and collaborator handles across ticks.
pub struct Scheduler {
    config: MonitorConfig,
    store: Arc<dyn UrlStore>,
    prober: Arc<dyn Prober>,
    state: Arc<RwLock<MonitorState>>,
    notification_tx: Option<UnboundedSender<Notification>>,
    last_cycle: Arc<RwLock<Option<DateTime<Utc>>>>,
    created_at: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn UrlStore>,
        prober: Arc<dyn Prober>,
        notification_tx: Option<UnboundedSender<Notification>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            prober,
            state: Arc::new(RwLock::new(MonitorState::Stopped)),
            notification_tx,
            last_cycle: Arc::new(RwLock::new(None)),
            created_at: Utc::now(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn state(&self) -> MonitorState {
        *self.state.read().await
    }

    pub async fn last_cycle(&self) -> Option<DateTime<Utc>> {
        *self.last_cycle.read().await
    }

    /// Start the periodic loop as a background task. Idempotent: calling
    /// while already running logs a warning and changes nothing.
    pub async fn start(&self) {
        {
            let mut state = self.state.write().await;
            if *state == MonitorState::Running {
                warn!("Monitoring is already running");
                return;
            }
            *state = MonitorState::Running;
        }

        info!(
            interval_secs = self.config.ping_interval.as_secs(),
            "Starting URL monitoring"
        );

        let state = Arc::clone(&self.state);
        let store = Arc::clone(&self.store);
        let prober = Arc::clone(&self.prober);
        let notification_tx = self.notification_tx.clone();
        let last_cycle = Arc::clone(&self.last_cycle);
        let interval = self.config.ping_interval;

        tokio::spawn(async move {
            let result = AssertUnwindSafe(run_loop(
                Arc::clone(&state),
                store,
                prober,
                notification_tx,
                last_cycle,
                interval,
            ))
            .catch_unwind()
            .await;

            if let Err(panic) = result {
                error!("Monitoring loop aborted by panic; monitoring stopped");
                *state.write().await = MonitorState::Stopped;
                std::panic::resume_unwind(panic);
            }
        });
    }

    /// Request the loop to stop. The in-flight cycle finishes; the flag is
    /// observed at the top of the next iteration and no further cycle runs.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        if *state == MonitorState::Running {
            *state = MonitorState::Stopped;
            info!("Monitoring stop requested; current cycle will finish");
        }
    }

    pub async fn status(&self) -> Result<MonitoringStatus, StoreError> {
        let total_urls = self.store.all_urls().await?.len();
        Ok(MonitoringStatus {
            is_running: self.state.read().await.is_running(),
            total_urls,
            ping_interval_secs: self.config.ping_interval.as_secs(),
            request_timeout_secs: self.config.request_timeout.as_secs(),
        })
    }

    /// One full ping cycle over every registered URL across all owners.
    /// This is exactly what the periodic loop runs each tick.
    pub async fn ping_all(&self) -> Result<HashMap<String, PingResult>, StoreError> {
        let targets = self.store.all_urls().await?;
        ping_batch(&self.store, &self.prober, &self.notification_tx, targets).await
    }

    /// Same fan-out as the periodic cycle, restricted to one owner's URLs.
    /// Safe to call while a periodic cycle is in flight; overlapping writes
    /// to the same key resolve last-write-wins.
    pub async fn ping_owner_urls(
        &self,
        owner: OwnerId,
    ) -> Result<HashMap<String, PingResult>, StoreError> {
        let targets: Vec<(String, OwnerId)> = self
            .store
            .urls(owner)
            .await?
            .into_keys()
            .map(|url| (url, owner))
            .collect();
        ping_batch(&self.store, &self.prober, &self.notification_tx, targets).await
    }

    /// Ephemeral connectivity check through the same prober the cycle uses.
    /// Writes nothing and alerts nobody.
    pub async fn ping_one(&self, url: &str) -> PingResult {
        self.prober.probe(url).await
    }

    /// Register a URL for an owner. Scheme-less input gets `https://`
    /// prepended before validation. Returns false if already registered.
    pub async fn add_url(&self, owner: OwnerId, raw_url: &str) -> Result<bool, StoreError> {
        let url = normalize_url(raw_url)?;
        self.store.add_url(owner, &url).await
    }

    /// Returns false if the URL was not registered for that owner.
    pub async fn remove_url(&self, owner: OwnerId, raw_url: &str) -> Result<bool, StoreError> {
        let url = normalize_url(raw_url)?;
        self.store.remove_url(owner, &url).await
    }

    pub async fn urls(&self, owner: OwnerId) -> Result<HashMap<String, UrlState>, StoreError> {
        self.store.urls(owner).await
    }

    pub async fn uptime_stats(
        &self,
        raw_url: &str,
        owner: OwnerId,
        window_hours: u32,
    ) -> Result<UptimeStats, StoreError> {
        let url = normalize_url(raw_url)?;
        self.store.uptime_stats(&url, owner, window_hours).await
    }

    pub async fn snapshot(&self) -> Result<Vec<MonitoredUrl>, StoreError> {
        self.store.snapshot().await
    }
}

async fn run_loop(
    state: Arc<RwLock<MonitorState>>,
    store: Arc<dyn UrlStore>,
    prober: Arc<dyn Prober>,
    notification_tx: Option<UnboundedSender<Notification>>,
    last_cycle: Arc<RwLock<Option<DateTime<Utc>>>>,
    interval: Duration,
) {
    loop {
        if *state.read().await != MonitorState::Running {
            info!("URL monitoring stopped");
            break;
        }

        let cycle_start = Instant::now();
        *last_cycle.write().await = Some(Utc::now());

        match store.all_urls().await {
            Ok(targets) => {
                if let Err(e) = ping_batch(&store, &prober, &notification_tx, targets).await {
                    error!(error = %e, "Not all check results could be persisted this cycle");
                }
            }
            Err(e) => error!(error = %e, "Failed to read URL set from store"),
        }

        let elapsed = cycle_start.elapsed();
        if elapsed >= interval {
            warn!(
                elapsed_secs = elapsed.as_secs_f64(),
                interval_secs = interval.as_secs(),
                "Ping cycle overran the interval, starting next cycle immediately"
            );
        } else {
            let sleep_for = interval - elapsed;
            debug!(
                sleep_secs = sleep_for.as_secs_f64(),
                "Sleeping until next ping cycle"
            );
            tokio::time::sleep(sleep_for).await;
        }
    }
}

/// Probe every target fully concurrently, persist each result, and notify
/// the owning admin for each failure.
///
/// One task is spawned per URL; the join boundary is where individual task
/// failures are contained, so one misbehaving probe never drops its
/// siblings' results. Store write failures are logged per URL, the rest of
/// the batch is still processed, and the first such error is returned.
async fn ping_batch(
    store: &Arc<dyn UrlStore>,
    prober: &Arc<dyn Prober>,
    notification_tx: &Option<UnboundedSender<Notification>>,
    targets: Vec<(String, OwnerId)>,
) -> Result<HashMap<String, PingResult>, StoreError> {
    if targets.is_empty() {
        debug!("No URLs to ping");
        return Ok(HashMap::new());
    }

    let handles: Vec<_> = targets
        .iter()
        .map(|(url, _)| {
            let prober = Arc::clone(prober);
            let url = url.clone();
            tokio::spawn(async move { prober.probe(&url).await })
        })
        .collect();

    let outcomes = join_all(handles).await;

    let mut results = HashMap::with_capacity(targets.len());
    let mut first_store_error = None;

    for ((url, owner), outcome) in targets.into_iter().zip(outcomes) {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(url = %url, error = %e, "Probe task failed");
                continue;
            }
        };

        if let Err(e) = store
            .update_status(
                &url,
                owner,
                result.status_code,
                result.response_time_secs,
                result.success,
            )
            .await
        {
            error!(url = %url, owner, error = %e, "Failed to persist check result");
            if first_store_error.is_none() {
                first_store_error = Some(e);
            }
        }

        if !result.success {
            if let Some(tx) = notification_tx {
                let _ = tx.send(Notification {
                    owner_id: owner,
                    result: result.clone(),
                });
            }
        }

        results.insert(url, result);
    }

    info!(count = results.len(), "Completed ping cycle");

    match first_store_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
