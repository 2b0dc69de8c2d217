use clap::Parser;
use pretty_assertions::assert_eq;
use shelf_core::{ClientConfig, DrainReport, LocalStore, Product, SyncStatus};

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::commands::add::{run_add, NewProduct};
use crate::commands::auth_cmd::{run_login, run_logout};
use crate::commands::common::{
    default_db_path, format_product_line, resolve_credential, resolve_product,
};
use crate::commands::config::run_config_set_url;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, ProductChanges};
use crate::commands::sync::{format_drain_report, run_sync};
use crate::error::CliError;

fn product(id: &str, name: &str) -> Product {
    Product {
        id: Some(id.to_string()),
        ..Product::new(name, "", "1")
    }
}

fn unreachable_config() -> ClientConfig {
    ClientConfig {
        request_timeout_secs: 1,
        ..ClientConfig::new("http://127.0.0.1:9").unwrap()
    }
}

async fn stored_products(db_path: &std::path::Path) -> Vec<Product> {
    let store = LocalStore::open(db_path).await.unwrap();
    store
        .entries()
        .await
        .unwrap()
        .into_iter()
        .filter(|(key, _)| key != "token")
        .map(|(_, raw)| serde_json::from_str(&raw).unwrap())
        .collect()
}

#[test]
fn default_db_path_is_namespaced() {
    let path = default_db_path();
    assert!(path.ends_with("shelf/shelf.db"));
}

#[test]
fn resolve_product_by_exact_id_and_prefix() {
    let records = vec![product("abc123", "Cola"), product("abd456", "Pepsi")];

    assert_eq!(resolve_product(&records, "abc123").unwrap().name, "Cola");
    assert_eq!(resolve_product(&records, " abd ").unwrap().name, "Pepsi");
    assert!(matches!(
        resolve_product(&records, "ab"),
        Err(CliError::AmbiguousProductId(_))
    ));
    assert!(matches!(
        resolve_product(&records, "zzz"),
        Err(CliError::ProductNotFound(_))
    ));
    assert!(matches!(
        resolve_product(&records, "  "),
        Err(CliError::EmptyProductId)
    ));
}

#[test]
fn product_lines_flag_pending_records() {
    let clean = product("srv-1", "Cola");
    assert_eq!(format_product_line(&clean), "srv-1  Cola  1");

    let pending = Product {
        status: SyncStatus::PendingUpdate,
        ..clean
    };
    assert_eq!(format_product_line(&pending), "srv-1  Cola  1  [pending-update]");
}

#[test]
fn drain_report_summary_mentions_leftovers() {
    let report = DrainReport {
        created: 2,
        failed: 1,
        ..DrainReport::default()
    };
    assert_eq!(
        format_drain_report(&report),
        "Sync completed: 2 created, 0 updated, 0 deleted, 1 still pending"
    );
}

#[test]
fn product_changes_only_touch_given_fields() {
    let changes = ProductChanges {
        price: Some("9".to_string()),
        ..ProductChanges::default()
    };
    assert!(!changes.is_empty());

    let edited = changes.apply(Product::new("Cola", "fizzy", "5"));
    assert_eq!(edited.name, "Cola");
    assert_eq!(edited.description, "fizzy");
    assert_eq!(edited.price, "9");
    assert!(ProductChanges::default().is_empty());
}

#[test]
fn cli_parses_global_flags_and_location() {
    let cli = Cli::try_parse_from([
        "shelf",
        "add",
        "Pepsi",
        "--price",
        "8",
        "--latitude",
        "46.77",
        "--longitude",
        "-23.6",
        "--offline",
    ])
    .unwrap();

    assert!(cli.offline);
    let Commands::Add {
        name,
        latitude,
        longitude,
        ..
    } = cli.command
    else {
        panic!("expected add command");
    };
    assert_eq!(name, "Pepsi");
    assert_eq!(latitude.zip(longitude), Some((46.77, -23.6)));

    let missing_longitude =
        Cli::try_parse_from(["shelf", "add", "Pepsi", "--price", "8", "--latitude", "1"]);
    assert!(missing_longitude.is_err());

    let cli = Cli::try_parse_from(["shelf", "config", "set-url", "http://x:1"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommands::SetUrl { .. }
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn login_then_logout_manages_stored_token() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shelf.db");

    run_login(" tok-1 ", &db_path).await.unwrap();
    let store = LocalStore::open(&db_path).await.unwrap();
    let credential = resolve_credential(&store, None).await.unwrap();
    assert_eq!(credential.expose(), "tok-1");
    drop(store);

    run_logout(&db_path).await.unwrap();
    let store = LocalStore::open(&db_path).await.unwrap();
    assert!(matches!(
        resolve_credential(&store, None).await,
        Err(CliError::NotLoggedIn)
    ));
    assert_eq!(
        resolve_credential(&store, Some("env-tok".to_string()))
            .await
            .unwrap()
            .expose(),
        "env-tok"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_add_edit_delete_stay_local() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shelf.db");
    let config = unreachable_config();
    run_login("tok", &db_path).await.unwrap();

    let new_product = NewProduct {
        name: "Pepsi".to_string(),
        description: String::new(),
        price: "8".to_string(),
        photo: None,
        location: None,
    };
    run_add(new_product, &config, &db_path, true).await.unwrap();

    let stored = stored_products(&db_path).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, SyncStatus::PendingCreate);
    let id = stored[0].id.clone().unwrap();

    let changes = ProductChanges {
        price: Some("9".to_string()),
        ..ProductChanges::default()
    };
    run_edit(&id, changes, &config, &db_path, true).await.unwrap();
    let stored = stored_products(&db_path).await;
    assert_eq!(stored[0].price, "9");
    assert_eq!(stored[0].status, SyncStatus::PendingCreate);

    run_delete(&id, &config, &db_path, true).await.unwrap();
    assert!(stored_products(&db_path).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_refuses_to_run_offline() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shelf.db");
    run_login("tok", &db_path).await.unwrap();

    let result = run_sync(&unreachable_config(), &db_path, true).await;
    assert!(matches!(result, Err(CliError::Offline)));
}

#[tokio::test(flavor = "multi_thread")]
async fn add_rejects_blank_names() {
    let dir = tempfile::tempdir().unwrap();
    let new_product = NewProduct {
        name: "  ".to_string(),
        description: String::new(),
        price: "1".to_string(),
        photo: None,
        location: None,
    };
    let result = run_add(
        new_product,
        &unreachable_config(),
        &dir.path().join("shelf.db"),
        true,
    )
    .await;
    assert!(matches!(result, Err(CliError::EmptyProductName)));
}

#[test]
fn set_url_writes_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    run_config_set_url("https://catalog.example.com/", &path).unwrap();
    let saved = ClientConfig::load_from_path(&path).unwrap().unwrap();
    assert_eq!(saved.api_base_url, "https://catalog.example.com");

    assert!(matches!(
        run_config_set_url("catalog.example.com", &path),
        Err(CliError::Config(_))
    ));
}
