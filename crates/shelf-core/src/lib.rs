//! shelf-core - Core library for Shelf
//!
//! This crate contains the catalog models, the durable local store, the
//! remote catalog client, the push channel and the reconciliation engine
//! that keeps all of them consistent across unreliable connectivity.

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod models;
pub mod push;
pub mod remote;
pub mod store;
pub mod util;

pub use config::{ClientConfig, PushPolicy};
pub use connectivity::{spawn_reconnect_listener, ConnectivityMonitor};
pub use engine::{
    CatalogState, DeleteOutcome, DrainReport, EngineOptions, FetchOutcome, PushDisposition,
    SaveOutcome, SyncEngine,
};
pub use error::{Error, Result};
pub use models::{Credential, Product, SyncStatus};
pub use push::{PushChannel, PushEvent, PushSubscription};
pub use remote::{CatalogRemote, MockCatalog, RemoteCatalogClient};
pub use store::LocalStore;
