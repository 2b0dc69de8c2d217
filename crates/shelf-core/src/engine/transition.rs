//! Per-record state transitions.
//!
//! Pure functions over [`Product`]; the engine performs the I/O they imply.

use crate::models::{is_local_id, synthesize_local_id, Product, SyncStatus};

/// Record as it is kept after a save that did not reach the server.
pub fn offline_save(product: Product) -> Product {
    match product.id.as_deref() {
        None => Product {
            id: Some(synthesize_local_id()),
            status: SyncStatus::PendingCreate,
            ..product
        },
        // Never reached the server: still a create, just a newer one
        Some(id) if is_local_id(id) => Product {
            status: SyncStatus::PendingCreate,
            version: product.version + 1,
            ..product
        },
        Some(_) => Product {
            status: SyncStatus::PendingUpdate,
            version: product.version + 1,
            ..product
        },
    }
}

/// Payload sent when updating a record the server already knows.
pub fn online_update(product: &Product) -> Product {
    Product {
        status: SyncStatus::Clean,
        version: product.version + 1,
        ..product.clone()
    }
}

/// Record as it is kept after a delete that did not reach the server.
pub fn offline_delete(product: &Product) -> Product {
    Product {
        status: SyncStatus::PendingDelete,
        ..product.clone()
    }
}

/// Server answer normalized for the projection.
pub fn confirmed(product: Product) -> Product {
    Product {
        status: SyncStatus::Clean,
        ..product
    }
}

/// What a drain does with one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainAction {
    /// Nothing pending
    Skip,
    Create,
    Update(String),
    Delete(String),
    /// Deleted before it ever reached the server
    Discard,
}

pub fn drain_action(product: &Product) -> DrainAction {
    let server_id = product.id().filter(|id| !is_local_id(id));

    match (product.status, server_id) {
        (SyncStatus::Clean, _) => DrainAction::Skip,
        (SyncStatus::PendingCreate, _) | (SyncStatus::PendingUpdate, None) => DrainAction::Create,
        (SyncStatus::PendingUpdate, Some(id)) => DrainAction::Update(id.to_string()),
        (SyncStatus::PendingDelete, Some(id)) => DrainAction::Delete(id.to_string()),
        (SyncStatus::PendingDelete, None) => DrainAction::Discard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with_id(id: &str, status: SyncStatus) -> Product {
        Product {
            id: Some(id.to_string()),
            status,
            version: 4,
            ..Product::new("Cola", "fizzy", "5")
        }
    }

    #[test]
    fn offline_save_of_new_record_becomes_pending_create() {
        let saved = offline_save(Product::new("Pepsi", "", "8"));
        assert_eq!(saved.status, SyncStatus::PendingCreate);
        assert!(saved.has_local_id());
        assert_eq!(saved.version, 0);
        assert_eq!(saved.name, "Pepsi");
    }

    #[test]
    fn offline_save_of_known_record_becomes_pending_update() {
        let saved = offline_save(with_id("srv-1", SyncStatus::Clean));
        assert_eq!(saved.status, SyncStatus::PendingUpdate);
        assert_eq!(saved.version, 5);
        assert_eq!(saved.id(), Some("srv-1"));
    }

    #[test]
    fn offline_edit_of_unsent_record_stays_a_create() {
        let local = offline_save(Product::new("Pepsi", "", "8"));
        let id = local.id.clone();

        let edited = offline_save(Product {
            price: "9".to_string(),
            ..local
        });
        assert_eq!(edited.status, SyncStatus::PendingCreate);
        assert_eq!(edited.id, id);
        assert_eq!(edited.version, 1);
    }

    #[test]
    fn online_update_bumps_version_and_cleans() {
        let payload = online_update(&with_id("srv-1", SyncStatus::PendingUpdate));
        assert_eq!(payload.status, SyncStatus::Clean);
        assert_eq!(payload.version, 5);
    }

    #[test]
    fn drain_dispatch_table() {
        assert_eq!(drain_action(&with_id("srv-1", SyncStatus::Clean)), DrainAction::Skip);
        assert_eq!(
            drain_action(&with_id("_local-x", SyncStatus::PendingCreate)),
            DrainAction::Create
        );
        assert_eq!(
            drain_action(&with_id("_local-x", SyncStatus::PendingUpdate)),
            DrainAction::Create
        );
        assert_eq!(
            drain_action(&with_id("srv-1", SyncStatus::PendingUpdate)),
            DrainAction::Update("srv-1".to_string())
        );
        assert_eq!(
            drain_action(&with_id("srv-1", SyncStatus::PendingDelete)),
            DrainAction::Delete("srv-1".to_string())
        );
        assert_eq!(
            drain_action(&with_id("_local-x", SyncStatus::PendingDelete)),
            DrainAction::Discard
        );
    }
}
