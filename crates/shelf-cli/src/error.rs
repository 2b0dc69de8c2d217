use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] shelf_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not logged in. Run `shelf login --token <TOKEN>` or set SHELF_TOKEN.")]
    NotLoggedIn,
    #[error("Product name cannot be empty")]
    EmptyProductName,
    #[error("Product ID cannot be empty")]
    EmptyProductId,
    #[error("Product not found for id/prefix: {0}")]
    ProductNotFound(String),
    #[error("{0}")]
    AmbiguousProductId(String),
    #[error("Nothing to change: pass at least one of --name, --price, --description, --photo")]
    NothingToEdit,
    #[error("The catalog service is unreachable; pending edits were kept")]
    Offline,
    #[error("Configuration error: {0}")]
    Config(String),
}
