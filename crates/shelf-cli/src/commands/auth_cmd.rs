use std::path::Path;

use shelf_core::{Credential, LocalStore};

use crate::error::CliError;

pub async fn run_login(token: &str, db_path: &Path) -> Result<(), CliError> {
    let credential = Credential::new(token)?;
    let store = LocalStore::open(db_path).await?;
    store.save_credential(&credential).await?;
    println!("Logged in");
    Ok(())
}

pub async fn run_logout(db_path: &Path) -> Result<(), CliError> {
    let store = LocalStore::open(db_path).await?;
    if store.clear_credential().await? {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}
