pub mod action_type;
pub mod entity_id;
pub mod file_status;
pub mod offline_file_id;
pub mod owner_id;
pub mod payload;
pub mod project_id;

pub use action_type::ActionType;
pub use entity_id::EntityId;
pub use file_status::FileStatus;
pub use offline_file_id::OfflineFileId;
pub use owner_id::OwnerId;
pub use payload::ActionPayload;
pub use project_id::ProjectId;
