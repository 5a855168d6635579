pub mod entities;
pub mod value_objects;

pub use entities::{OfflineFile, ProjectAction};
pub use value_objects::{ActionType, EntityId, FileStatus, OfflineFileId, ProjectId};
