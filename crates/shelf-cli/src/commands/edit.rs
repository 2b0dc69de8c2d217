use std::path::Path;

use shelf_core::{ClientConfig, Product};

use crate::commands::common::{resolve_product, Session};
use crate::error::CliError;

/// Requested field changes; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

impl ProductChanges {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.photo.is_none()
    }

    pub fn apply(self, product: Product) -> Product {
        Product {
            name: self.name.unwrap_or(product.name),
            price: self.price.unwrap_or(product.price),
            description: self.description.unwrap_or(product.description),
            photo_path: self.photo.or(product.photo_path),
            ..product
        }
    }
}

pub async fn run_edit(
    id: &str,
    changes: ProductChanges,
    config: &ClientConfig,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    if changes.is_empty() {
        return Err(CliError::NothingToEdit);
    }

    let session = Session::open(config, db_path, offline).await?;
    session.load().await;
    let product = resolve_product(&session.engine.state().records, id)?;

    let outcome = session
        .engine
        .save(changes.apply(product), session.connected, &session.credential)
        .await?;

    let id = outcome.product.id().unwrap_or("-");
    if outcome.synced {
        println!("{id}");
    } else {
        println!("{id} (pending sync)");
    }
    Ok(())
}
