use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Lifecycle of one worker instance.
///
/// `Parsed → Installing → Waiting → Activating → Active → Terminated`.
/// A failed install ends in `Terminated` as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed, not yet serving.
    Waiting,
    Activating,
    /// Handling fetch and push until the host replaces the instance.
    Active,
    Terminated,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Terminated => "terminated",
        }
    }

    /// Whether fetches from controlled pages are routed through the cache
    pub fn controls_pages(&self) -> bool {
        matches!(self, WorkerState::Active)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the install phase did.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Legacy buckets that existed and were removed
    pub legacy_deleted: Vec<String>,
    pub seeded: Vec<Url>,
    pub failed: Vec<SeedFailure>,
}

#[derive(Debug, Clone)]
pub struct SeedFailure {
    pub url: String,
    pub reason: String,
}

/// What the activate phase did.
#[derive(Debug, Clone, Default)]
pub struct ActivateReport {
    /// Every bucket removed, legacy or discovered
    pub deleted: Vec<String>,
    pub clients_claimed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&WorkerState::Active).unwrap(), "\"active\"");
        let state: WorkerState = serde_json::from_str("\"waiting\"").unwrap();
        assert_eq!(state, WorkerState::Waiting);
    }

    #[test]
    fn test_only_active_controls_pages() {
        assert!(WorkerState::Active.controls_pages());
        assert!(!WorkerState::Waiting.controls_pages());
        assert!(!WorkerState::Activating.controls_pages());
        assert!(!WorkerState::Terminated.controls_pages());
    }
}
