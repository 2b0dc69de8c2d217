//! In-memory product catalog with change notifications.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const CHANGE_BUFFER: usize = 128;

/// A product as stored by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProduct {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Frame sent to push subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ChangeFrame {
    Created(StoredProduct),
    Updated(StoredProduct),
}

pub struct Catalog {
    products: RwLock<Vec<StoredProduct>>,
    changes: broadcast::Sender<ChangeFrame>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            products: RwLock::new(Vec::new()),
            changes,
        }
    }

    pub async fn list(&self) -> Vec<StoredProduct> {
        self.products.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<StoredProduct> {
        self.products
            .read()
            .await
            .iter()
            .find(|product| product.id.as_deref() == Some(id))
            .cloned()
    }

    /// Store a new product under a fresh identifier; any client id is ignored.
    pub async fn create(&self, product: StoredProduct) -> StoredProduct {
        let created = StoredProduct {
            id: Some(Uuid::now_v7().to_string()),
            status: 0,
            ..product
        };
        self.products.write().await.push(created.clone());
        self.notify(ChangeFrame::Created(created.clone()));
        created
    }

    /// Replace a product; the version is kept as the client sent it.
    pub async fn update(&self, id: &str, product: StoredProduct) -> Option<StoredProduct> {
        let updated = {
            let mut products = self.products.write().await;
            let slot = products
                .iter_mut()
                .find(|existing| existing.id.as_deref() == Some(id))?;
            *slot = StoredProduct {
                id: Some(id.to_string()),
                status: 0,
                ..product
            };
            slot.clone()
        };
        self.notify(ChangeFrame::Updated(updated.clone()));
        Some(updated)
    }

    pub async fn delete(&self, id: &str) -> bool {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|product| product.id.as_deref() != Some(id));
        products.len() != before
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeFrame> {
        self.changes.subscribe()
    }

    /// Number of live push subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn notify(&self, frame: ChangeFrame) {
        // No subscribers is not an error.
        if self.changes.send(frame).is_err() {
            tracing::debug!("No push subscribers for catalog change");
        }
    }
}
