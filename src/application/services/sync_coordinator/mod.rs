pub mod action_phase;
pub mod core;
pub mod file_phase;

pub use self::core::{SyncCoordinator, TRANSIENT_RETRY_MESSAGE};
