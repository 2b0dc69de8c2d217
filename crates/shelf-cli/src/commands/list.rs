use std::path::Path;

use shelf_core::ClientConfig;

use crate::commands::common::{format_product_lines, Session};
use crate::error::CliError;

pub async fn run_list(
    as_json: bool,
    config: &ClientConfig,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    let session = Session::open(config, db_path, offline).await?;
    session.load().await;
    let state = session.engine.state();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&state.records)?);
        return Ok(());
    }

    if let Some(error) = &state.fetching_error {
        eprintln!("Showing cached products: {error}");
    }
    if state.records.is_empty() {
        println!("No products.");
    }
    for line in format_product_lines(&state.records) {
        println!("{line}");
    }
    Ok(())
}
