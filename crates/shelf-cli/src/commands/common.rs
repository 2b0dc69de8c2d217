use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shelf_core::util::normalize_text_option;
use shelf_core::{
    ClientConfig, Credential, EngineOptions, LocalStore, Product, RemoteCatalogClient, SyncEngine,
};

use crate::error::CliError;

const TOKEN_ENV_VAR: &str = "SHELF_TOKEN";

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
        .join("shelf.db")
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
        .join("config.json")
}

/// Config file when present, `SHELF_*` environment variables otherwise.
pub fn load_client_config(path: &Path) -> Result<ClientConfig, CliError> {
    match ClientConfig::load_from_path(path)? {
        Some(config) => Ok(config),
        None => Ok(ClientConfig::from_env()?),
    }
}

/// Everything a catalog command needs.
pub struct Session {
    pub engine: SyncEngine<RemoteCatalogClient>,
    pub client: RemoteCatalogClient,
    pub credential: Credential,
    pub connected: bool,
}

impl Session {
    /// Open the store, resolve the credential and probe the service.
    ///
    /// With `offline` set the service is never contacted.
    pub async fn open(
        config: &ClientConfig,
        db_path: &Path,
        offline: bool,
    ) -> Result<Self, CliError> {
        let store = LocalStore::open(db_path).await?;
        let credential = resolve_credential(&store, env::var(TOKEN_ENV_VAR).ok()).await?;
        let client = RemoteCatalogClient::new(config)?;
        let connected = !offline && client.probe().await;
        tracing::debug!(
            "Session opened against {} ({})",
            client.base_url(),
            if connected { "online" } else { "offline" }
        );

        let engine = SyncEngine::new(
            Arc::new(client.clone()),
            store,
            EngineOptions::from(config),
        );
        Ok(Self {
            engine,
            client,
            credential,
            connected,
        })
    }

    /// Populate the projection: from the service when online, else from the store.
    pub async fn load(&self) {
        if self.connected {
            self.engine.fetch_all(&self.credential).await;
        } else {
            self.engine.load_cached().await;
        }
    }
}

/// Stored credential first, then the environment override.
pub async fn resolve_credential(
    store: &LocalStore,
    env_token: Option<String>,
) -> Result<Credential, CliError> {
    if let Some(credential) = store.load_credential().await? {
        return Ok(credential);
    }
    match normalize_text_option(env_token) {
        Some(token) => Ok(Credential::new(token)?),
        None => Err(CliError::NotLoggedIn),
    }
}

pub fn normalize_product_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyProductId);
    }
    Ok(trimmed.to_string())
}

/// Find a product by exact id or unique id prefix.
pub fn resolve_product(records: &[Product], query: &str) -> Result<Product, CliError> {
    let query = normalize_product_identifier(query)?;
    if let Some(exact) = records.iter().find(|record| record.id() == Some(query.as_str())) {
        return Ok(exact.clone());
    }

    let matches: Vec<&Product> = records
        .iter()
        .filter(|record| record.id().is_some_and(|id| id.starts_with(&query)))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::ProductNotFound(query)),
        [single] => Ok((*single).clone()),
        several => {
            let options = several
                .iter()
                .take(3)
                .filter_map(|record| record.id())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousProductId(format!(
                "Product id prefix '{query}' is ambiguous: {options}"
            )))
        }
    }
}

pub fn format_product_line(product: &Product) -> String {
    let id = product.id().unwrap_or("-");
    let mut line = format!("{id}  {}  {}", product.name, product.price);
    if product.status.is_pending() {
        line.push_str(&format!("  [{}]", product.status));
    }
    line
}

pub fn format_product_lines(products: &[Product]) -> Vec<String> {
    products.iter().map(format_product_line).collect()
}
