pub mod cache_entries;
pub mod drain_report;
pub mod offline_file;
pub mod pending_action;
pub mod progress;

pub use cache_entries::{CachedDocument, CachedProjectsEntry, CachedRecordsEntry, PruneResult};
pub use drain_report::{
    DrainOutcome, DrainPhase, DrainReport, DrainTrigger, PhaseReport, RecoveryReport,
};
pub use offline_file::{FileMetadata, OfflineFile, OfflineFileDraft};
pub use pending_action::{ColumnAction, PendingDeletion, ProjectAction, RecordAction};
pub use progress::{ProgressSnapshot, ProgressStatus};
