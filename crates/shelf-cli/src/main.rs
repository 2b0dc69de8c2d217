//! Shelf CLI - edit the product catalog from the terminal
//!
//! Edits made while the catalog service is unreachable are kept locally and
//! synced later with `shelf sync` or `shelf watch`.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use std::time::Duration;

use clap::Parser;

use cli::{Cli, Commands, ConfigCommands};
use commands::add::{run_add, NewProduct};
use commands::auth_cmd::{run_login, run_logout};
use commands::common::{config_path, default_db_path, load_client_config};
use commands::config::{run_config_set_url, run_config_show};
use commands::delete::run_delete;
use commands::edit::{run_edit, ProductChanges};
use commands::list::run_list;
use commands::sync::{run_pending, run_sync};
use commands::watch::run_watch;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shelf=info".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = cli.db_path.unwrap_or_else(default_db_path);
    let config_path = config_path();
    let offline = cli.offline;

    let client_config = || load_client_config(&config_path);

    match cli.command {
        Commands::Login { token } => run_login(&token, &db_path).await?,
        Commands::Logout => run_logout(&db_path).await?,
        Commands::List { json } => run_list(json, &client_config()?, &db_path, offline).await?,
        Commands::Add {
            name,
            price,
            description,
            photo,
            latitude,
            longitude,
        } => {
            let new_product = NewProduct {
                name,
                description,
                price,
                photo,
                location: latitude.zip(longitude),
            };
            run_add(new_product, &client_config()?, &db_path, offline).await?;
        }
        Commands::Edit {
            id,
            name,
            price,
            description,
            photo,
        } => {
            let changes = ProductChanges {
                name,
                price,
                description,
                photo,
            };
            run_edit(&id, changes, &client_config()?, &db_path, offline).await?;
        }
        Commands::Delete { id } => run_delete(&id, &client_config()?, &db_path, offline).await?,
        Commands::Sync => run_sync(&client_config()?, &db_path, offline).await?,
        Commands::Pending { json } => run_pending(json, &client_config()?, &db_path).await?,
        Commands::Watch { interval_secs } => {
            let interval = Duration::from_secs(interval_secs);
            run_watch(interval, &client_config()?, &db_path, offline).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => run_config_show(&client_config()?, &config_path)?,
            ConfigCommands::SetUrl { url } => run_config_set_url(&url, &config_path)?,
        },
    }

    Ok(())
}
