//! Reconciliation engine.
//!
//! Owns the catalog projection and is the only writer of the projection and
//! the local store. Intents are applied optimistically: a save or delete that
//! cannot reach the server is kept in the local store as a pending record and
//! shown as if it had synced. [`SyncEngine::drain`] later replays pending
//! records against the catalog service.
//!
//! Locking: `save` and `delete` serialize per record identifier;
//! `fetch_all` and `drain` are whole-catalog operations and share one gate.

mod state;
mod transition;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use crate::config::{ClientConfig, PushPolicy};
use crate::error::{Error, Result};
use crate::models::{is_local_id, Credential, Product, SyncStatus};
use crate::push::PushEvent;
use crate::remote::CatalogRemote;
use crate::store::{is_reserved_key, LocalStore};

pub use state::CatalogState;
pub use transition::DrainAction;

use state::Action;

/// Lock map size above which idle entries are dropped.
const LOCK_PRUNE_THRESHOLD: usize = 64;

/// Engine behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub push_policy: PushPolicy,
    /// Also keep clean server copies in the local store for offline reads
    pub cache_clean_records: bool,
}

impl From<&ClientConfig> for EngineOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            push_policy: config.push_policy,
            cache_clean_records: config.cache_clean_records,
        }
    }
}

/// Result of a save intent.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// Record as it now appears in the projection
    pub product: Product,
    /// Whether the catalog service confirmed it
    pub synced: bool,
}

/// Result of a delete intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The catalog service confirmed the delete
    Synced,
    /// Kept as pending-delete until the next drain
    Pending,
    /// Never reached the server; the local entry was dropped
    Discarded,
}

/// Result of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Remote { count: usize },
    /// Served from the local store after a remote failure
    Cached { count: usize },
    /// Superseded by a newer fetch or cancelled
    Discarded,
}

/// Counters for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub discarded: usize,
    /// Left pending for the next pass
    pub failed: usize,
    /// Unparseable entries that were skipped
    pub corrupt: usize,
}

impl DrainReport {
    /// Entries the pass resolved.
    pub const fn synced(&self) -> usize {
        self.created + self.updated + self.deleted + self.discarded
    }

    fn record(&mut self, action: &DrainAction) {
        match action {
            DrainAction::Skip => {}
            DrainAction::Create => self.created += 1,
            DrainAction::Update(_) => self.updated += 1,
            DrainAction::Delete(_) => self.deleted += 1,
            DrainAction::Discard => self.discarded += 1,
        }
    }
}

/// What the engine did with a push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDisposition {
    Ignored,
    Applied,
    /// The local copy has unsynced edits
    SkippedPending,
}

/// Single writer of the catalog projection and the local store.
pub struct SyncEngine<R: CatalogRemote> {
    remote: Arc<R>,
    store: LocalStore,
    options: EngineOptions,
    state: watch::Sender<CatalogState>,
    record_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Local ids already replaced by a server id, mapped to that id
    replaced_ids: StdMutex<HashMap<String, String>>,
    bulk_gate: Mutex<()>,
    fetch_generation: AtomicU64,
    last_connectivity: StdMutex<Option<bool>>,
}

impl<R: CatalogRemote> SyncEngine<R> {
    pub fn new(remote: Arc<R>, store: LocalStore, options: EngineOptions) -> Self {
        Self {
            remote,
            store,
            options,
            state: watch::Sender::new(CatalogState::default()),
            record_locks: StdMutex::new(HashMap::new()),
            replaced_ids: StdMutex::new(HashMap::new()),
            bulk_gate: Mutex::new(()),
            fetch_generation: AtomicU64::new(0),
            last_connectivity: StdMutex::new(None),
        }
    }

    /// Current snapshot of the catalog state.
    pub fn state(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn options(&self) -> EngineOptions {
        self.options
    }

    /// Records in the local store still waiting for a drain.
    pub async fn pending_records(&self) -> Result<Vec<Product>> {
        let entries = self.store.entries().await?;
        Ok(entries
            .into_iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .filter_map(|(key, raw)| parse_entry(&key, &raw).ok())
            .filter(|product| product.status.is_pending())
            .collect())
    }

    /// Create or update a record.
    ///
    /// With `connected == false` no request is attempted and the record goes
    /// straight to the pending path. Remote failures are recovered the same
    /// way; only local store failures are returned.
    pub async fn save(
        &self,
        mut product: Product,
        connected: bool,
        credential: &Credential,
    ) -> Result<SaveOutcome> {
        let _guard = match product.id.take() {
            Some(id) => {
                let (current, guard) = self.lock_current(&id).await;
                product.id = Some(current);
                Some(guard)
            }
            None => None,
        };

        self.dispatch(Action::SaveStarted);
        let result = self.save_locked(product, connected, credential).await;
        if let Err(error) = &result {
            self.dispatch(Action::SaveFailed(error.to_string()));
        }
        result
    }

    async fn save_locked(
        &self,
        product: Product,
        connected: bool,
        credential: &Credential,
    ) -> Result<SaveOutcome> {
        let previous_id = product.id.clone();
        let remote_result = if connected {
            self.send_save(&product, credential).await
        } else {
            Err(Error::NotConnected)
        };

        match remote_result {
            Ok(saved) => {
                let saved = transition::confirmed(saved);
                if let Some(previous) = previous_id.as_deref() {
                    self.store.remove(previous).await?;
                    self.remember_replacement(previous, &saved);
                }
                self.cache_clean(&saved).await?;
                tracing::debug!("Saved product {:?}", saved.id());

                self.dispatch(Action::SaveSucceeded {
                    previous_id,
                    product: saved.clone(),
                });
                Ok(SaveOutcome {
                    product: saved,
                    synced: true,
                })
            }
            Err(error) if error.is_remote_failure() => {
                let pending = transition::offline_save(product);
                self.persist(&pending).await?;
                tracing::info!(
                    "Product {:?} kept as {} until the next sync: {}",
                    pending.id(),
                    pending.status,
                    error
                );

                self.dispatch(Action::SaveFellBack {
                    previous_id,
                    product: pending.clone(),
                    error: error.to_string(),
                });
                Ok(SaveOutcome {
                    product: pending,
                    synced: false,
                })
            }
            Err(error) => Err(error),
        }
    }

    async fn send_save(&self, product: &Product, credential: &Credential) -> Result<Product> {
        match product.id() {
            Some(id) if !is_local_id(id) => {
                let payload = transition::online_update(product);
                self.remote.update(credential, id, &payload).await
            }
            _ => self.remote.create(credential, product).await,
        }
    }

    /// Delete a record.
    ///
    /// A record that only ever existed locally is discarded without any
    /// request, even when connected.
    pub async fn delete(
        &self,
        product: &Product,
        connected: bool,
        credential: &Credential,
    ) -> Result<DeleteOutcome> {
        let id = product
            .id()
            .ok_or_else(|| Error::InvalidInput("cannot delete a product without an id".to_string()))?;
        let (id, _guard) = self.lock_current(id).await;
        let product = Product {
            id: Some(id.clone()),
            ..product.clone()
        };

        self.dispatch(Action::DeleteStarted);
        let result = self
            .delete_locked(&product, &id, connected, credential)
            .await;
        if let Err(error) = &result {
            self.dispatch(Action::DeleteFailed(error.to_string()));
        }
        result
    }

    async fn delete_locked(
        &self,
        product: &Product,
        id: &str,
        connected: bool,
        credential: &Credential,
    ) -> Result<DeleteOutcome> {
        if is_local_id(id) {
            self.store.remove(id).await?;
            tracing::debug!("Discarded unsynced product {}", id);
            self.dispatch(Action::DeleteSucceeded { id: id.to_string() });
            return Ok(DeleteOutcome::Discarded);
        }

        let remote_result = if connected {
            self.remote.delete(credential, id).await
        } else {
            Err(Error::NotConnected)
        };

        match remote_result {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                tracing::debug!("Product {} was already gone on the server", id);
            }
            Err(error) if error.is_remote_failure() => {
                self.persist(&transition::offline_delete(product)).await?;
                tracing::info!("Delete of {} kept pending until the next sync: {}", id, error);
                self.dispatch(Action::DeleteFellBack {
                    id: id.to_string(),
                    error: error.to_string(),
                });
                return Ok(DeleteOutcome::Pending);
            }
            Err(error) => return Err(error),
        }

        self.store.remove(id).await?;
        self.dispatch(Action::DeleteSucceeded { id: id.to_string() });
        Ok(DeleteOutcome::Synced)
    }

    /// Replay every pending record against the catalog service.
    ///
    /// Entries are independent: a failure leaves that entry pending and the
    /// pass moves on. Returns `None` when a fetch or another drain holds the
    /// bulk gate.
    pub async fn drain(&self, credential: &Credential) -> Result<Option<DrainReport>> {
        let Ok(_gate) = self.bulk_gate.try_lock() else {
            tracing::debug!("Drain skipped: another catalog-wide operation is running");
            return Ok(None);
        };
        self.drain_gated(credential).await.map(Some)
    }

    /// Caller holds the bulk gate.
    async fn drain_gated(&self, credential: &Credential) -> Result<DrainReport> {
        let mut report = DrainReport::default();
        for key in self.store.keys().await? {
            if is_reserved_key(&key) {
                continue;
            }

            let lock = self.record_lock(&key);
            let _guard = lock.lock().await;

            // Re-read under the record lock; a concurrent intent may have
            // changed or removed the entry.
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let product = match parse_entry(&key, &raw) {
                Ok(product) => product,
                Err(error) => {
                    tracing::warn!("Skipping local entry: {}", error);
                    report.corrupt += 1;
                    continue;
                }
            };

            let action = transition::drain_action(&product);
            match self.drain_entry(&key, product, &action, credential).await {
                Ok(()) => report.record(&action),
                Err(error) => {
                    tracing::warn!("Sync of {} failed, will retry: {}", key, error);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Drain finished: {} synced, {} failed, {} corrupt",
            report.synced(),
            report.failed,
            report.corrupt
        );
        Ok(report)
    }

    async fn drain_entry(
        &self,
        key: &str,
        product: Product,
        action: &DrainAction,
        credential: &Credential,
    ) -> Result<()> {
        match action {
            DrainAction::Skip => Ok(()),
            DrainAction::Create => {
                let created = self.remote.create(credential, &product).await?;
                self.settle(key, transition::confirmed(created)).await
            }
            DrainAction::Update(id) => {
                let payload = transition::confirmed(product);
                let updated = self.remote.update(credential, id, &payload).await?;
                self.settle(key, transition::confirmed(updated)).await
            }
            DrainAction::Delete(id) => {
                match self.remote.delete(credential, id).await {
                    Ok(()) => {}
                    Err(error) if error.is_not_found() => {}
                    Err(error) => return Err(error),
                }
                self.store.remove(key).await?;
                Ok(())
            }
            DrainAction::Discard => {
                self.store.remove(key).await?;
                Ok(())
            }
        }
    }

    /// Drop the pending entry and show the server's copy in its place.
    async fn settle(&self, key: &str, product: Product) -> Result<()> {
        self.store.remove(key).await?;
        self.remember_replacement(key, &product);
        self.cache_clean(&product).await?;
        self.dispatch(Action::Replaced {
            previous_id: key.to_string(),
            product,
        });
        Ok(())
    }

    /// Load the full catalog.
    ///
    /// On success the projection is replaced wholesale. On failure it is
    /// rebuilt from the local store, skipping pending deletes and corrupt
    /// entries.
    pub async fn fetch_all(&self, credential: &Credential) -> FetchOutcome {
        let generation = self.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _gate = self.bulk_gate.lock().await;
        if self.is_superseded(generation) {
            return FetchOutcome::Discarded;
        }

        self.dispatch(Action::FetchStarted);
        match self.remote.list(credential).await {
            Ok(records) => {
                if self.is_superseded(generation) {
                    self.dispatch(Action::FetchCancelled);
                    return FetchOutcome::Discarded;
                }
                for record in &records {
                    if let Err(error) = self.cache_clean(record).await {
                        tracing::warn!("Failed to cache {:?}: {}", record.id(), error);
                    }
                }

                let count = records.len();
                tracing::debug!("Fetched {} products", count);
                self.dispatch(Action::FetchSucceeded(records));
                FetchOutcome::Remote { count }
            }
            Err(error) => {
                let records = self.cached_records().await;
                if self.is_superseded(generation) {
                    self.dispatch(Action::FetchCancelled);
                    return FetchOutcome::Discarded;
                }

                let count = records.len();
                tracing::info!("Fetch failed, showing {} cached products: {}", count, error);
                self.dispatch(Action::FetchFellBack {
                    records,
                    error: error.to_string(),
                });
                FetchOutcome::Cached { count }
            }
        }
    }

    /// Build the projection from the local store alone, without a request.
    pub async fn load_cached(&self) -> usize {
        let _gate = self.bulk_gate.lock().await;
        let records = self.cached_records().await;
        let count = records.len();
        self.dispatch(Action::FetchSucceeded(records));
        count
    }

    /// Discard the result of any fetch currently in flight.
    pub fn cancel_fetch(&self) {
        self.fetch_generation.fetch_add(1, Ordering::SeqCst);
        self.dispatch(Action::FetchCancelled);
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.fetch_generation.load(Ordering::SeqCst) != generation
    }

    async fn cached_records(&self) -> Vec<Product> {
        let entries = match self.store.entries().await {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!("Local store unreadable, no cached products: {}", error);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .filter_map(|(key, raw)| match parse_entry(&key, &raw) {
                Ok(product) => Some(product),
                Err(error) => {
                    tracing::warn!("Skipping local entry: {}", error);
                    None
                }
            })
            .filter(|product| product.status != SyncStatus::PendingDelete)
            .collect()
    }

    /// React to a server push according to the configured policy.
    pub async fn handle_push(&self, event: PushEvent) -> PushDisposition {
        if self.options.push_policy == PushPolicy::Ignore {
            tracing::info!(
                "Push '{}' for {:?} ignored by policy",
                event.kind(),
                event.product().id()
            );
            return PushDisposition::Ignored;
        }

        let product = transition::confirmed(event.product().clone());
        let Some(id) = product.id().map(str::to_string) else {
            tracing::warn!("Push '{}' without a product id ignored", event.kind());
            return PushDisposition::Ignored;
        };

        let lock = self.record_lock(&id);
        let _guard = lock.lock().await;

        if self.has_pending_copy(&id).await {
            tracing::debug!("Push for {} skipped: local edits pending", id);
            return PushDisposition::SkippedPending;
        }
        if let Err(error) = self.cache_clean(&product).await {
            tracing::warn!("Failed to cache pushed product {}: {}", id, error);
        }
        self.dispatch(Action::Upserted(product));
        PushDisposition::Applied
    }

    async fn has_pending_copy(&self, id: &str) -> bool {
        let in_projection = self
            .state
            .borrow()
            .find(id)
            .is_some_and(|record| record.status.is_pending());
        if in_projection {
            return true;
        }

        match self.store.get(id).await {
            Ok(Some(raw)) => parse_entry(id, &raw).map_or(true, |stored| stored.status.is_pending()),
            Ok(None) => false,
            Err(error) => {
                tracing::warn!("Local store unreadable, treating {} as pending: {}", id, error);
                true
            }
        }
    }

    /// Record a connectivity report; drains on every transition to connected.
    ///
    /// The first report after start counts as a transition. Unlike
    /// [`SyncEngine::drain`], the reconnect drain waits for a running fetch.
    /// If it fails the transition is not recorded, so the next connected
    /// report retries.
    pub async fn connectivity_changed(
        &self,
        connected: bool,
        credential: &Credential,
    ) -> Option<DrainReport> {
        let previous = self
            .last_connectivity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(connected);

        if !connected || previous == Some(true) {
            return None;
        }

        tracing::info!("Connectivity restored, syncing pending products");
        let _gate = self.bulk_gate.lock().await;
        match self.drain_gated(credential).await {
            Ok(report) => Some(report),
            Err(error) => {
                tracing::warn!("Sync after reconnect failed: {}", error);
                *self
                    .last_connectivity
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = previous;
                None
            }
        }
    }

    async fn persist(&self, product: &Product) -> Result<()> {
        let id = product
            .id()
            .ok_or_else(|| Error::InvalidInput("cannot store a product without an id".to_string()))?;
        self.store.set(id, &serde_json::to_string(product)?).await
    }

    /// Keep a clean copy when caching is enabled, never over a pending one.
    async fn cache_clean(&self, product: &Product) -> Result<()> {
        if !self.options.cache_clean_records {
            return Ok(());
        }
        let Some(id) = product.id() else {
            return Ok(());
        };
        if let Some(raw) = self.store.get(id).await? {
            if parse_entry(id, &raw).is_ok_and(|stored| stored.status.is_pending()) {
                return Ok(());
            }
        }
        self.persist(product).await
    }

    fn record_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .record_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    /// Lock a record under its current id.
    ///
    /// A local id replaced by a drain or an online create while the caller
    /// waited resolves to the server id, so the intent lands on that record.
    async fn lock_current(&self, id: &str) -> (String, OwnedMutexGuard<()>) {
        let mut id = self.current_id(id);
        loop {
            let guard = self.record_lock(&id).lock_owned().await;
            let current = self.current_id(&id);
            if current == id {
                return (id, guard);
            }
            id = current;
        }
    }

    fn current_id(&self, id: &str) -> String {
        self.replaced_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn remember_replacement(&self, local_id: &str, product: &Product) {
        let Some(server_id) = product.id() else {
            return;
        };
        if is_local_id(local_id) && local_id != server_id {
            self.replaced_ids
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(local_id.to_string(), server_id.to_string());
        }
    }

    fn dispatch(&self, action: Action) {
        self.state.send_modify(|state| state.apply(action));
    }
}

fn parse_entry(key: &str, raw: &str) -> Result<Product> {
    serde_json::from_str(raw).map_err(|error| Error::StoreCorruption {
        key: key.to_string(),
        reason: error.to_string(),
    })
}
