use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What started a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainTrigger {
    Startup,
    Reconnect,
    QueueChanged,
    Interval,
    Manual,
}

impl DrainTrigger {
    /// Interrupted uploads are recovered only when a new session begins.
    pub fn runs_recovery(&self) -> bool {
        matches!(self, DrainTrigger::Startup | DrainTrigger::Reconnect)
    }
}

/// Drain phases in their fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPhase {
    ProjectActions,
    ColumnActions,
    RecordUpdates,
    RecordDeletions,
    LegacyDeletions,
    FileUploads,
}

impl DrainPhase {
    pub const ORDER: [DrainPhase; 6] = [
        DrainPhase::ProjectActions,
        DrainPhase::ColumnActions,
        DrainPhase::RecordUpdates,
        DrainPhase::RecordDeletions,
        DrainPhase::LegacyDeletions,
        DrainPhase::FileUploads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrainPhase::ProjectActions => "project_actions",
            DrainPhase::ColumnActions => "column_actions",
            DrainPhase::RecordUpdates => "record_updates",
            DrainPhase::RecordDeletions => "record_deletions",
            DrainPhase::LegacyDeletions => "legacy_deletions",
            DrainPhase::FileUploads => "file_uploads",
        }
    }
}

impl fmt::Display for DrainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: DrainPhase,
    pub synced: u32,
    pub failed: u32,
    pub purged: u32,
    /// Set when an expired session or a lost sync lock stopped the phase early.
    pub aborted: bool,
}

impl PhaseReport {
    pub fn new(phase: DrainPhase) -> Self {
        Self {
            phase,
            synced: 0,
            failed: 0,
            purged: 0,
            aborted: false,
        }
    }
}

/// Outcome of the crash-recovery pass over `syncing` files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RecoveryReport {
    pub removed: u32,
    pub reset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrainReport {
    pub trigger: DrainTrigger,
    pub recovery: RecoveryReport,
    pub phases: Vec<PhaseReport>,
    /// Another instance took the sync lock over mid-drain.
    #[serde(default)]
    pub lease_lost: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DrainReport {
    pub fn synced_count(&self) -> u32 {
        self.phases.iter().map(|p| p.synced).sum()
    }

    pub fn failed_count(&self) -> u32 {
        self.phases.iter().map(|p| p.failed).sum()
    }

    pub fn purged_count(&self) -> u32 {
        self.phases.iter().map(|p| p.purged).sum()
    }

    pub fn phase(&self, phase: DrainPhase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}

/// Result of asking the coordinator to drain. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    /// Another drain in this instance is running.
    AlreadyRunning,
    /// Another instance holds the cross-instance lock.
    LockHeldElsewhere,
}

impl DrainOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}
