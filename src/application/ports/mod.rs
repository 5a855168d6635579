pub mod local_store;
pub mod remote_api;
pub mod sync_lock;

pub use local_store::{LocalStore, StoreTable, StoredRecord, TypedTable};
pub use remote_api::{PresignedUpload, RemoteApi, RemoteError};
pub use sync_lock::{CrossTabLock, LockLease};
