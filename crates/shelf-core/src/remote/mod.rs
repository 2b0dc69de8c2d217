//! Remote catalog service client.
//!
//! Stateless: every call takes the caller's credential and nothing is kept
//! between requests beyond the pooled HTTP connection.

mod mock;

use std::future::Future;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{is_local_id, Credential, Product, SyncStatus};
use crate::util::compact_text;

pub use mock::{MockCall, MockCatalog};

/// Operations the engine needs from the catalog service.
pub trait CatalogRemote: Send + Sync {
    fn list(&self, credential: &Credential) -> impl Future<Output = Result<Vec<Product>>> + Send;

    fn get(
        &self,
        credential: &Credential,
        id: &str,
    ) -> impl Future<Output = Result<Product>> + Send;

    /// Create a record; the service assigns its identifier.
    fn create(
        &self,
        credential: &Credential,
        product: &Product,
    ) -> impl Future<Output = Result<Product>> + Send;

    fn update(
        &self,
        credential: &Credential,
        id: &str,
        product: &Product,
    ) -> impl Future<Output = Result<Product>> + Send;

    fn delete(&self, credential: &Credential, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP client for the `/product` resource.
#[derive(Debug, Clone)]
pub struct RemoteCatalogClient {
    base_url: String,
    client: Client,
}

impl RemoteCatalogClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let config = config.clone().validated()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| Error::Transport(error.to_string()))?;

        Ok(Self {
            base_url: config.api_base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the service answers at all.
    ///
    /// Any HTTP response counts, including errors; only transport failures
    /// mean unreachable.
    pub async fn probe(&self) -> bool {
        match self.client.get(self.collection_url()).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Catalog service unreachable: {}", error);
                false
            }
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/product", self.base_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/product/{}", self.base_url, urlencoding::encode(id))
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request
            .bearer_auth(credential.expose())
            .header("Accept", "application/json")
    }

    async fn execute(&self, operation: &str, request: RequestBuilder) -> Result<String> {
        tracing::debug!("Catalog {} started", operation);

        let response = request.send().await.map_err(|error| {
            tracing::debug!("Catalog {} failed: {}", operation, error);
            Error::Transport(error.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| Error::Transport(error.to_string()))?;

        if !status.is_success() {
            tracing::debug!("Catalog {} failed with HTTP {}", operation, status.as_u16());
            return Err(Error::Service {
                status: status.as_u16(),
                body: compact_text(&body),
            });
        }

        tracing::debug!("Catalog {} succeeded", operation);
        Ok(body)
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let body = self.execute(operation, request).await?;
        serde_json::from_str(&body).map_err(|error| Error::InvalidPayload(error.to_string()))
    }
}

impl CatalogRemote for RemoteCatalogClient {
    async fn list(&self, credential: &Credential) -> Result<Vec<Product>> {
        let request = self.authorized(self.client.get(self.collection_url()), credential);
        self.execute_json("list", request).await
    }

    async fn get(&self, credential: &Credential, id: &str) -> Result<Product> {
        ensure_server_id(id)?;
        let request = self.authorized(self.client.get(self.record_url(id)), credential);
        self.execute_json("get", request).await
    }

    async fn create(&self, credential: &Credential, product: &Product) -> Result<Product> {
        let payload = outbound_create(product);
        let request = self.authorized(
            self.client.post(self.collection_url()).json(&payload),
            credential,
        );
        self.execute_json("create", request).await
    }

    async fn update(&self, credential: &Credential, id: &str, product: &Product) -> Result<Product> {
        ensure_server_id(id)?;
        let request = self.authorized(self.client.put(self.record_url(id)).json(product), credential);
        self.execute_json("update", request).await
    }

    async fn delete(&self, credential: &Credential, id: &str) -> Result<()> {
        ensure_server_id(id)?;
        let request = self.authorized(self.client.delete(self.record_url(id)), credential);
        self.execute("delete", request).await.map(|_| ())
    }
}

/// Payload for a create: no identifier, clean status.
pub(crate) fn outbound_create(product: &Product) -> Product {
    Product {
        id: None,
        status: SyncStatus::Clean,
        ..product.clone()
    }
}

fn ensure_server_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput("product id must not be empty".to_string()));
    }
    if is_local_id(id) {
        return Err(Error::InvalidInput(format!(
            "'{id}' is a local placeholder id and cannot be sent to the catalog service"
        )));
    }
    Ok(())
}
