use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Edit the product catalog from the command line, online or off")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local store file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Do not contact the catalog service; edits stay pending
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store the bearer token used for every request
    Login {
        /// Token issued by your catalog administrator
        #[arg(long)]
        token: String,
    },
    /// Forget the stored token
    Logout,
    /// List products
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a product
    #[command(alias = "new")]
    Add {
        name: String,
        #[arg(long)]
        price: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Path or URL of a product photo
        #[arg(long)]
        photo: Option<String>,
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
    },
    /// Edit an existing product
    Edit {
        /// Product ID or unique ID prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        photo: Option<String>,
    },
    /// Delete a product
    Delete {
        /// Product ID or unique ID prefix
        id: String,
    },
    /// Push every pending offline edit to the catalog service
    Sync,
    /// Show edits waiting to be synced
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stay running: sync on reconnect and print pushed changes
    Watch {
        /// Seconds between connectivity probes
        #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..=3600))]
        interval_secs: u64,
    },
    /// Inspect or change CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Point the CLI at another catalog service
    SetUrl {
        /// Base URL, e.g. http://localhost:3000
        url: String,
    },
}
