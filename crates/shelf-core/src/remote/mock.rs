//! In-memory catalog double for engine tests and offline demos.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::models::{Credential, Product, SyncStatus};

use super::{outbound_create, CatalogRemote};

/// A call received by [`MockCatalog`], recorded even when it failed.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    List,
    Get(String),
    Create(Product),
    Update(String, Product),
    Delete(String),
}

#[derive(Debug, Default)]
struct MockState {
    products: Vec<Product>,
    calls: Vec<MockCall>,
    failure_status: Option<u16>,
}

/// A [`CatalogRemote`] backed by a vector, with an online switch.
#[derive(Debug)]
pub struct MockCatalog {
    online: AtomicBool,
    next_id: AtomicU64,
    state: Mutex<MockState>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Creates an online, empty catalog.
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            state: Mutex::new(MockState::default()),
        }
    }

    /// While offline every call fails with a transport error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make every call answer with the given HTTP status (`None` to reset).
    pub fn fail_with_status(&self, status: Option<u16>) {
        self.lock().failure_status = status;
    }

    /// Seed a server-side record, assigning an id when it has none.
    pub fn insert(&self, product: Product) -> Product {
        let stored = Product {
            id: product.id.clone().or_else(|| Some(self.allocate_id())),
            status: SyncStatus::Clean,
            ..product
        };
        self.lock().products.push(stored.clone());
        stored
    }

    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn allocate_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and check the online switch and forced failures.
    fn begin(&self, call: MockCall) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(call);

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Transport("mock catalog is offline".to_string()));
        }
        if let Some(status) = state.failure_status {
            return Err(Error::Service {
                status,
                body: "mock failure".to_string(),
            });
        }
        Ok(state)
    }
}

fn not_found(id: &str) -> Error {
    Error::Service {
        status: 404,
        body: format!("product '{id}' not found"),
    }
}

impl CatalogRemote for MockCatalog {
    async fn list(&self, _credential: &Credential) -> Result<Vec<Product>> {
        let state = self.begin(MockCall::List)?;
        Ok(state.products.clone())
    }

    async fn get(&self, _credential: &Credential, id: &str) -> Result<Product> {
        let state = self.begin(MockCall::Get(id.to_string()))?;
        state
            .products
            .iter()
            .find(|product| product.id() == Some(id))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, _credential: &Credential, product: &Product) -> Result<Product> {
        let payload = outbound_create(product);
        let mut state = self.begin(MockCall::Create(payload.clone()))?;
        let created = Product {
            id: Some(self.allocate_id()),
            ..payload
        };
        state.products.push(created.clone());
        Ok(created)
    }

    async fn update(&self, _credential: &Credential, id: &str, product: &Product) -> Result<Product> {
        let mut state = self.begin(MockCall::Update(id.to_string(), product.clone()))?;
        let slot = state
            .products
            .iter_mut()
            .find(|existing| existing.id() == Some(id))
            .ok_or_else(|| not_found(id))?;
        *slot = Product {
            id: Some(id.to_string()),
            status: SyncStatus::Clean,
            ..product.clone()
        };
        Ok(slot.clone())
    }

    async fn delete(&self, _credential: &Credential, id: &str) -> Result<()> {
        let mut state = self.begin(MockCall::Delete(id.to_string()))?;
        let before = state.products.len();
        state.products.retain(|product| product.id() != Some(id));
        if state.products.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_mock_records_calls_and_fails() {
        let catalog = MockCatalog::new();
        let credential = Credential::new("tok").unwrap();

        catalog.set_online(false);
        let error = catalog.list(&credential).await.unwrap_err();
        assert!(error.is_remote_failure());
        assert_eq!(catalog.calls(), vec![MockCall::List]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_update_delete_cycle() {
        let catalog = MockCatalog::new();
        let credential = Credential::new("tok").unwrap();

        let created = catalog
            .create(&credential, &Product::new("Pepsi", "", "8"))
            .await
            .unwrap();
        assert_eq!(created.id(), Some("srv-1"));

        let edited = Product {
            price: "9".to_string(),
            ..created.clone()
        };
        let updated = catalog.update(&credential, "srv-1", &edited).await.unwrap();
        assert_eq!(updated.price, "9");
        assert_eq!(catalog.get(&credential, "srv-1").await.unwrap().price, "9");

        catalog.delete(&credential, "srv-1").await.unwrap();
        assert!(catalog
            .delete(&credential, "srv-1")
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(catalog.call_count(), 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forced_status_surfaces_as_service_error() {
        let catalog = MockCatalog::new();
        let credential = Credential::new("tok").unwrap();
        catalog.fail_with_status(Some(503));

        let error = catalog.list(&credential).await.unwrap_err();
        assert!(matches!(error, Error::Service { status: 503, .. }));
    }
}
