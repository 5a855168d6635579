pub mod offline;

pub use offline::{
    CachedDocument, CachedProjectsEntry, CachedRecordsEntry, ColumnAction, DrainOutcome,
    DrainPhase, DrainReport, DrainTrigger, FileMetadata, OfflineFile, OfflineFileDraft,
    PendingDeletion, PhaseReport, ProgressSnapshot, ProgressStatus, ProjectAction, PruneResult,
    RecordAction, RecoveryReport,
};
