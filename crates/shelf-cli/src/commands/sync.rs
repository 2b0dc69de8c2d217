use std::path::Path;
use std::sync::Arc;

use shelf_core::{
    ClientConfig, DrainReport, EngineOptions, LocalStore, RemoteCatalogClient, SyncEngine,
};

use crate::commands::common::{format_product_lines, Session};
use crate::error::CliError;

pub async fn run_sync(config: &ClientConfig, db_path: &Path, offline: bool) -> Result<(), CliError> {
    let session = Session::open(config, db_path, offline).await?;
    if !session.connected {
        return Err(CliError::Offline);
    }

    match session.engine.drain(&session.credential).await? {
        Some(report) => println!("{}", format_drain_report(&report)),
        None => println!("Sync skipped: another sync is in progress"),
    }
    Ok(())
}

pub fn format_drain_report(report: &DrainReport) -> String {
    let mut summary = format!(
        "Sync completed: {} created, {} updated, {} deleted",
        report.created, report.updated, report.deleted
    );
    if report.discarded > 0 {
        summary.push_str(&format!(", {} discarded", report.discarded));
    }
    if report.failed > 0 {
        summary.push_str(&format!(", {} still pending", report.failed));
    }
    if report.corrupt > 0 {
        summary.push_str(&format!(", {} unreadable entries skipped", report.corrupt));
    }
    summary
}

pub async fn run_pending(
    as_json: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    // Reads the local store only; no credential needed.
    let engine = SyncEngine::new(
        Arc::new(RemoteCatalogClient::new(config)?),
        LocalStore::open(db_path).await?,
        EngineOptions::from(config),
    );
    let pending = engine.pending_records().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }
    for line in format_product_lines(&pending) {
        println!("{line}");
    }
    Ok(())
}
