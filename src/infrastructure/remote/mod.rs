pub mod classify;
pub mod http_remote_api;

pub use classify::{classify_failure, classify_storage_failure, transport_failure};
pub use http_remote_api::HttpRemoteApi;
