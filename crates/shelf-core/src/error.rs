//! Error types for shelf-core

use thiserror::Error;

/// Result type alias using shelf-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shelf-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The request never reached the catalog service (offline, DNS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The catalog service answered with a non-2xx status
    #[error("Service error (HTTP {status}): {body}")]
    Service { status: u16, body: String },

    /// The catalog service answered 2xx with a body we could not decode
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),

    /// The caller declared itself offline; no transport attempt was made
    #[error("Not connected")]
    NotConnected,

    /// A local store entry could not be parsed as a product
    #[error("Corrupt local store entry '{key}': {reason}")]
    StoreCorruption { key: String, reason: String },

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Push channel error
    #[error("Push channel error: {0}")]
    Push(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error means "the remote operation did not happen".
    ///
    /// The engine recovers every such failure through the offline path.
    pub const fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Service { .. } | Self::InvalidPayload(_) | Self::NotConnected
        )
    }

    /// Whether the catalog service reported the record as missing.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Service { status: 404, .. })
    }
}
