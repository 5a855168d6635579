pub mod offline;

pub use offline::{
    ActionPayload, ActionType, EntityId, FileStatus, OfflineFileId, OwnerId, ProjectId,
};
