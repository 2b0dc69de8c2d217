//! Product model

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker carried by identifiers synthesized on-device.
///
/// Server identifiers never start with this prefix.
pub const LOCAL_ID_PREFIX: &str = "_local-";

/// Generate a placeholder identifier for a product the server has not seen yet.
#[must_use]
pub fn synthesize_local_id() -> String {
    format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4().simple())
}

/// Whether `id` was synthesized locally rather than assigned by the server.
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Sync state of a product relative to the remote catalog.
///
/// Serialized as its integer code (`0..=3`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SyncStatus {
    /// Matches the server copy
    #[default]
    Clean,
    /// Created offline, never sent to the server
    PendingCreate,
    /// Edited offline, server holds an older copy
    PendingUpdate,
    /// Deleted offline, server still holds the record
    PendingDelete,
}

impl SyncStatus {
    /// Wire code for this status.
    pub const fn code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::PendingCreate => 1,
            Self::PendingUpdate => 2,
            Self::PendingDelete => 3,
        }
    }

    /// Whether the record still has to reach the server.
    pub const fn is_pending(self) -> bool {
        !matches!(self, Self::Clean)
    }
}

impl From<SyncStatus> for u8 {
    fn from(status: SyncStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for SyncStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Clean),
            1 => Ok(Self::PendingCreate),
            2 => Ok(Self::PendingUpdate),
            3 => Ok(Self::PendingDelete),
            other => Err(format!("unknown sync status code {other}")),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Clean => "clean",
            Self::PendingCreate => "pending-create",
            Self::PendingUpdate => "pending-update",
            Self::PendingDelete => "pending-delete",
        };
        f.write_str(label)
    }
}

/// A catalog item
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Server-assigned or locally synthesized identifier
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form price text as entered by the user
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub status: SyncStatus,
    /// Local change counter
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Product {
    /// Create a new, not yet saved product
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price: price.into(),
            ..Self::default()
        }
    }

    /// Attach a photo reference
    #[must_use]
    pub fn with_photo(mut self, photo_path: impl Into<String>) -> Self {
        self.photo_path = Some(photo_path.into());
        self
    }

    /// Attach a geolocation
    #[must_use]
    pub const fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Identifier as a string slice, if any
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether the identifier is a local placeholder
    pub fn has_local_id(&self) -> bool {
        self.id().is_some_and(is_local_id)
    }

    /// Whether the server assigned this product's identifier
    pub fn has_server_id(&self) -> bool {
        self.id().is_some_and(|id| !is_local_id(id))
    }
}
