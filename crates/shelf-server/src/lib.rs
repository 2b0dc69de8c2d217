//! shelf-server - reference catalog service for Shelf
//!
//! Serves the `/product` REST resource and the push websocket at `/`.
//! Everything is kept in memory; restart loses the catalog.

pub mod catalog;
pub mod config;
pub mod error;
mod push;
mod routes;

pub use catalog::{Catalog, ChangeFrame, StoredProduct};
pub use config::{ConfigError, ServerConfig};
pub use error::AppError;
pub use routes::{app_router, extract_bearer_token, AppState};
