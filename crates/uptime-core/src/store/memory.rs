use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::{
    compute_uptime, CheckRecord, MonitoredUrl, OwnerId, StoreError, UptimeStats, UrlState,
    UrlStatus, UrlStore,
};

/// Fixed-capacity ring of check records. O(1) append, evicts oldest when
/// full, so per-URL storage stays bounded while the windowed uptime query
/// remains exact for any window that fits the capacity.
#[derive(Debug, Clone)]
pub struct CheckHistory {
    buffer: VecDeque<CheckRecord>,
    capacity: usize,
}

impl CheckHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: CheckRecord) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(record);
    }

    /// Records oldest first.
    pub fn records(&self) -> Vec<CheckRecord> {
        self.buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[derive(Debug)]
struct UrlEntry {
    state: UrlState,
    history: CheckHistory,
}

/// In-memory [`UrlStore`] keyed by (owner, URL).
///
/// Entry-level locking makes each update atomic per key; writers on
/// different keys never contend, and same-key races resolve last-write-wins.
pub struct MemoryStore {
    entries: DashMap<(OwnerId, String), UrlEntry>,
    history_limit: usize,
}

impl MemoryStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            entries: DashMap::new(),
            history_limit,
        }
    }

    pub fn from_config(config: &crate::config::MonitorConfig) -> Self {
        Self::new(config.history_limit)
    }
}

#[async_trait]
impl UrlStore for MemoryStore {
    async fn add_url(&self, owner: OwnerId, url: &str) -> Result<bool, StoreError> {
        match self.entries.entry((owner, url.to_string())) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(UrlEntry {
                    state: UrlState::pending(Utc::now()),
                    history: CheckHistory::new(self.history_limit),
                });
                Ok(true)
            }
        }
    }

    async fn remove_url(&self, owner: OwnerId, url: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(&(owner, url.to_string())).is_some())
    }

    async fn urls(&self, owner: OwnerId) -> Result<HashMap<String, UrlState>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().0 == owner)
            .map(|e| (e.key().1.clone(), e.value().state.clone()))
            .collect())
    }

    async fn all_urls(&self) -> Result<Vec<(String, OwnerId)>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|e| (e.key().1.clone(), e.key().0))
            .collect())
    }

    async fn update_status(
        &self,
        url: &str,
        owner: OwnerId,
        status_code: u16,
        response_time_secs: f64,
        success: bool,
    ) -> Result<(), StoreError> {
        let Some(mut entry) = self.entries.get_mut(&(owner, url.to_string())) else {
            debug!(url, owner, "Dropping check result for unregistered URL");
            return Ok(());
        };

        let now = Utc::now();
        entry.state.status = if success {
            UrlStatus::Online
        } else {
            UrlStatus::Offline
        };
        entry.state.last_check = Some(now);
        entry.state.response_time_secs = Some(response_time_secs);
        entry.state.last_status_code = Some(status_code);
        entry.history.push(CheckRecord {
            timestamp: now,
            success,
            status_code,
            response_time_secs,
        });

        Ok(())
    }

    async fn uptime_stats(
        &self,
        url: &str,
        owner: OwnerId,
        window_hours: u32,
    ) -> Result<UptimeStats, StoreError> {
        match self.entries.get(&(owner, url.to_string())) {
            Some(entry) => Ok(compute_uptime(
                &entry.history.records(),
                window_hours,
                Utc::now(),
            )),
            None => Ok(UptimeStats::empty(window_hours)),
        }
    }

    async fn snapshot(&self) -> Result<Vec<MonitoredUrl>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|e| MonitoredUrl {
                owner_id: e.key().0,
                url: e.key().1.clone(),
                state: e.value().state.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(success: bool) -> CheckRecord {
        CheckRecord {
            timestamp: Utc::now(),
            success,
            status_code: if success { 200 } else { 500 },
            response_time_secs: 0.1,
        }
    }

    #[test]
    fn history_evicts_oldest_at_capacity() {
        let mut history = CheckHistory::new(3);
        for i in 0..5 {
            history.push(CheckRecord {
                timestamp: Utc::now(),
                success: true,
                status_code: 200,
                response_time_secs: i as f64,
            });
        }
        assert_eq!(history.len(), 3);
        let records = history.records();
        assert_eq!(records[0].response_time_secs, 2.0);
        assert_eq!(records[2].response_time_secs, 4.0);
    }

    #[test]
    fn history_single_capacity() {
        let mut history = CheckHistory::new(1);
        history.push(make_record(true));
        history.push(make_record(false));
        assert_eq!(history.len(), 1);
        assert!(!history.records()[0].success);
    }

    #[tokio::test]
    async fn add_url_is_unique_per_owner() {
        let store = MemoryStore::new(10);
        assert!(store.add_url(1, "https://a.com").await.unwrap());
        assert!(!store.add_url(1, "https://a.com").await.unwrap());
        // Same URL, different owner: independent entry.
        assert!(store.add_url(2, "https://a.com").await.unwrap());
        assert_eq!(store.all_urls().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_url_twice_returns_false_second_time() {
        let store = MemoryStore::new(10);
        store.add_url(1, "https://a.com").await.unwrap();
        assert!(store.remove_url(1, "https://a.com").await.unwrap());
        assert!(!store.remove_url(1, "https://a.com").await.unwrap());
        assert!(store.urls(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_is_pending_until_first_check() {
        let store = MemoryStore::new(10);
        store.add_url(1, "https://a.com").await.unwrap();

        let urls = store.urls(1).await.unwrap();
        let state = &urls["https://a.com"];
        assert_eq!(state.status, UrlStatus::Pending);
        assert!(state.last_check.is_none());
        assert!(state.response_time_secs.is_none());
        assert!(state.last_status_code.is_none());

        let stats = store.uptime_stats("https://a.com", 1, 24).await.unwrap();
        assert_eq!(stats.total_checks, 0);
        assert_eq!(stats.uptime_percentage, 0.0);
    }

    #[tokio::test]
    async fn update_status_transitions_and_appends() {
        let store = MemoryStore::new(10);
        store.add_url(1, "https://a.com").await.unwrap();

        store
            .update_status("https://a.com", 1, 200, 0.15, true)
            .await
            .unwrap();
        let state = store.urls(1).await.unwrap()["https://a.com"].clone();
        assert_eq!(state.status, UrlStatus::Online);
        assert_eq!(state.last_status_code, Some(200));
        assert_eq!(state.response_time_secs, Some(0.15));
        assert!(state.last_check.is_some());

        store
            .update_status("https://a.com", 1, 500, 0.3, false)
            .await
            .unwrap();
        let state = store.urls(1).await.unwrap()["https://a.com"].clone();
        assert_eq!(state.status, UrlStatus::Offline);
        assert_eq!(state.last_status_code, Some(500));

        let stats = store.uptime_stats("https://a.com", 1, 24).await.unwrap();
        assert_eq!(stats.total_checks, 2);
        assert_eq!(stats.successful_checks, 1);
        assert_eq!(stats.failed_checks, 1);
        assert_eq!(stats.uptime_percentage, 50.0);
    }

    #[tokio::test]
    async fn update_for_unregistered_url_is_a_noop() {
        let store = MemoryStore::new(10);
        store
            .update_status("https://gone.com", 1, 200, 0.1, true)
            .await
            .unwrap();
        assert!(store.all_urls().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owners_do_not_leak_into_each_other() {
        let store = MemoryStore::new(10);
        store.add_url(1, "https://x.com").await.unwrap();
        store.add_url(2, "https://x.com").await.unwrap();

        store
            .update_status("https://x.com", 1, 500, 0.2, false)
            .await
            .unwrap();

        let owner1 = store.urls(1).await.unwrap();
        let owner2 = store.urls(2).await.unwrap();
        assert_eq!(owner1["https://x.com"].status, UrlStatus::Offline);
        assert_eq!(owner2["https://x.com"].status, UrlStatus::Pending);

        let stats1 = store.uptime_stats("https://x.com", 1, 24).await.unwrap();
        let stats2 = store.uptime_stats("https://x.com", 2, 24).await.unwrap();
        assert_eq!(stats1.total_checks, 1);
        assert_eq!(stats2.total_checks, 0);
    }

    #[tokio::test]
    async fn stats_for_unknown_url_are_empty() {
        let store = MemoryStore::new(10);
        let stats = store.uptime_stats("https://nope.com", 9, 24).await.unwrap();
        assert_eq!(stats.total_checks, 0);
        assert_eq!(stats.uptime_percentage, 0.0);
        assert_eq!(stats.window_hours, 24);
    }

    #[tokio::test]
    async fn snapshot_lists_every_pair() {
        let store = MemoryStore::new(10);
        store.add_url(1, "https://a.com").await.unwrap();
        store.add_url(1, "https://b.com").await.unwrap();
        store.add_url(2, "https://a.com").await.unwrap();

        let mut snapshot = store.snapshot().await.unwrap();
        snapshot.sort_by(|a, b| (a.owner_id, &a.url).cmp(&(b.owner_id, &b.url)));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].owner_id, 1);
        assert_eq!(snapshot[2].owner_id, 2);
    }
}
