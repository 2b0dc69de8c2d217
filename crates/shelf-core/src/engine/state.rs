//! UI-facing catalog state and the reducer that mutates it.

use crate::models::Product;

/// Snapshot of everything a catalog screen renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    /// The projection: newest records first, updated records keep their slot
    pub records: Vec<Product>,
    pub fetching: bool,
    pub fetching_error: Option<String>,
    pub saving: bool,
    pub saving_error: Option<String>,
    pub deleting: bool,
    pub deleting_error: Option<String>,
}

impl CatalogState {
    pub fn find(&self, id: &str) -> Option<&Product> {
        self.records.iter().find(|record| record.id() == Some(id))
    }

    pub(crate) fn apply(&mut self, action: Action) {
        match action {
            Action::FetchStarted => {
                self.fetching = true;
                self.fetching_error = None;
            }
            Action::FetchSucceeded(records) => {
                self.fetching = false;
                self.records = records;
            }
            Action::FetchFellBack { records, error } => {
                self.fetching = false;
                self.fetching_error = Some(error);
                self.records = records;
            }
            Action::FetchCancelled => self.fetching = false,
            Action::SaveStarted => {
                self.saving = true;
                self.saving_error = None;
            }
            Action::SaveSucceeded {
                previous_id,
                product,
            } => {
                self.saving = false;
                self.upsert(previous_id.as_deref(), product);
            }
            Action::SaveFellBack {
                previous_id,
                product,
                error,
            } => {
                self.saving = false;
                self.saving_error = Some(error);
                self.upsert(previous_id.as_deref(), product);
            }
            Action::SaveFailed(error) => {
                self.saving = false;
                self.saving_error = Some(error);
            }
            Action::DeleteStarted => {
                self.deleting = true;
                self.deleting_error = None;
            }
            Action::DeleteSucceeded { id } => {
                self.deleting = false;
                self.remove(&id);
            }
            Action::DeleteFellBack { id, error } => {
                self.deleting = false;
                self.deleting_error = Some(error);
                self.remove(&id);
            }
            Action::DeleteFailed(error) => {
                self.deleting = false;
                self.deleting_error = Some(error);
            }
            Action::Replaced {
                previous_id,
                product,
            } => self.upsert(Some(&previous_id), product),
            Action::Upserted(product) => self.upsert(None, product),
        }
    }

    /// Replace the record matching `previous_id` (or the product's own id)
    /// in place, otherwise prepend it.
    fn upsert(&mut self, previous_id: Option<&str>, product: Product) {
        let key = previous_id.or_else(|| product.id()).map(str::to_string);
        let slot = key.and_then(|key| {
            self.records
                .iter()
                .position(|record| record.id() == Some(key.as_str()))
        });

        match slot {
            Some(index) => self.records[index] = product,
            None => self.records.insert(0, product),
        }
    }

    fn remove(&mut self, id: &str) {
        self.records.retain(|record| record.id() != Some(id));
    }
}

/// Every projection mutation goes through one of these.
#[derive(Debug, Clone)]
pub(crate) enum Action {
    FetchStarted,
    FetchSucceeded(Vec<Product>),
    FetchFellBack {
        records: Vec<Product>,
        error: String,
    },
    FetchCancelled,
    SaveStarted,
    SaveSucceeded {
        previous_id: Option<String>,
        product: Product,
    },
    SaveFellBack {
        previous_id: Option<String>,
        product: Product,
        error: String,
    },
    SaveFailed(String),
    DeleteStarted,
    DeleteSucceeded {
        id: String,
    },
    DeleteFellBack {
        id: String,
        error: String,
    },
    DeleteFailed(String),
    /// A drained record came back under its server identity
    Replaced {
        previous_id: String,
        product: Product,
    },
    Upserted(Product),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: Some(id.to_string()),
            ..Product::new(name, "", "1")
        }
    }

    #[test]
    fn new_records_are_prepended_and_updates_keep_their_slot() {
        let mut state = CatalogState::default();
        state.apply(Action::FetchSucceeded(vec![product("a", "A"), product("b", "B")]));

        state.apply(Action::SaveSucceeded {
            previous_id: None,
            product: product("c", "C"),
        });
        state.apply(Action::SaveSucceeded {
            previous_id: Some("b".to_string()),
            product: product("b", "B2"),
        });

        let names: Vec<&str> = state.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B2"]);
        assert!(!state.saving);
    }

    #[test]
    fn replaced_swaps_identity_in_place() {
        let mut state = CatalogState::default();
        state.apply(Action::FetchSucceeded(vec![product("_local-1", "Pepsi"), product("a", "A")]));

        state.apply(Action::Replaced {
            previous_id: "_local-1".to_string(),
            product: product("srv-9", "Pepsi"),
        });

        assert_eq!(state.records[0].id(), Some("srv-9"));
        assert!(state.find("_local-1").is_none());
        assert_eq!(state.records.len(), 2);
    }

    #[test]
    fn fallbacks_carry_error_messages() {
        let mut state = CatalogState::default();
        state.apply(Action::FetchStarted);
        assert!(state.fetching);

        state.apply(Action::FetchFellBack {
            records: vec![product("a", "A")],
            error: "offline".to_string(),
        });
        assert!(!state.fetching);
        assert_eq!(state.fetching_error.as_deref(), Some("offline"));

        state.apply(Action::DeleteStarted);
        state.apply(Action::DeleteFellBack {
            id: "a".to_string(),
            error: "offline".to_string(),
        });
        assert!(state.records.is_empty());
        assert_eq!(state.deleting_error.as_deref(), Some("offline"));

        state.apply(Action::SaveStarted);
        assert_eq!(state.saving_error, None);
    }
}
