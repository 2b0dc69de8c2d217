use std::path::Path;

use shelf_core::{ClientConfig, DeleteOutcome};

use crate::commands::common::{resolve_product, Session};
use crate::error::CliError;

pub async fn run_delete(
    id: &str,
    config: &ClientConfig,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    let session = Session::open(config, db_path, offline).await?;
    session.load().await;
    let product = resolve_product(&session.engine.state().records, id)?;

    let outcome = session
        .engine
        .delete(&product, session.connected, &session.credential)
        .await?;

    let id = product.id().unwrap_or("-");
    match outcome {
        DeleteOutcome::Synced | DeleteOutcome::Discarded => println!("{id}"),
        DeleteOutcome::Pending => println!("{id} (pending sync)"),
    }
    Ok(())
}
