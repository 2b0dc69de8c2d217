use std::path::Path;

use shelf_core::{ClientConfig, Product};

use crate::commands::common::Session;
use crate::error::CliError;

/// Fields of a new product as given on the command line.
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: String,
    pub photo: Option<String>,
    pub location: Option<(f64, f64)>,
}

impl NewProduct {
    pub fn into_product(self) -> Product {
        let mut product = Product::new(self.name.trim(), self.description.trim(), self.price.trim());
        if let Some(photo) = self.photo {
            product = product.with_photo(photo);
        }
        if let Some((latitude, longitude)) = self.location {
            product = product.with_location(latitude, longitude);
        }
        product
    }
}

pub async fn run_add(
    new_product: NewProduct,
    config: &ClientConfig,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    if new_product.name.trim().is_empty() {
        return Err(CliError::EmptyProductName);
    }

    let session = Session::open(config, db_path, offline).await?;
    let outcome = session
        .engine
        .save(new_product.into_product(), session.connected, &session.credential)
        .await?;

    let id = outcome.product.id().unwrap_or("-");
    if outcome.synced {
        println!("{id}");
    } else {
        println!("{id} (pending sync)");
    }
    Ok(())
}
