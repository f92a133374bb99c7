use serde::{Deserialize, Serialize};

/// The scheduler's lifecycle. `stop()` flips to `Stopped` immediately; the
/// loop observes the flag at the top of its next iteration, so an in-flight
/// cycle always runs to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Stopped,
    Running,
}

impl MonitorState {
    pub fn is_running(self) -> bool {
        self == MonitorState::Running
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Snapshot of the scheduler exposed to status surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringStatus {
    pub is_running: bool,
    pub total_urls: usize,
    pub ping_interval_secs: u64,
    pub request_timeout_secs: u64,
}
