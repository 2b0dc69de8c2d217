//! Data models for Shelf

mod credential;
mod product;

pub use credential::Credential;
pub use product::{is_local_id, synthesize_local_id, Product, SyncStatus, LOCAL_ID_PREFIX};
