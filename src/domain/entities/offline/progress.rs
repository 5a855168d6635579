use serde::{Deserialize, Serialize};

/// Counts of queued work across every queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub pending_files: usize,
    pub syncing_files: usize,
    pub failed_files: usize,
    pub pending_actions: usize,
}

impl ProgressSnapshot {
    pub fn total(&self) -> usize {
        self.pending_files + self.syncing_files + self.failed_files + self.pending_actions
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// UI-facing sync status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgressStatus {
    Idle,
    Syncing { pending: usize, in_flight: usize },
    WaitingForConnection { pending: usize },
    Complete,
}
