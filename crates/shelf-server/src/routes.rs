use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::catalog::{Catalog, StoredProduct};
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::push::push_socket;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn from_config(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            catalog: Arc::new(Catalog::new()),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/product", get(list_products).post(create_product))
        .route(
            "/product/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(push_socket))
        .route("/healthz", get(healthz))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    push_subscribers: usize,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        push_subscribers: state.catalog.subscriber_count(),
    })
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    if !state.config.accepts(token) {
        return Err(AppError::unauthorized("Bearer token is not accepted"));
    }
    Ok(next.run(request).await)
}

async fn list_products(State(state): State<AppState>) -> Json<Vec<StoredProduct>> {
    Json(state.catalog.list().await)
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredProduct>, AppError> {
    state
        .catalog
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(&id))
}

async fn create_product(
    State(state): State<AppState>,
    Json(product): Json<StoredProduct>,
) -> Result<(StatusCode, Json<StoredProduct>), AppError> {
    validate(&product)?;
    let created = state.catalog.create(product).await;
    tracing::info!(id = created.id.as_deref().unwrap_or(""), "Created product");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(product): Json<StoredProduct>,
) -> Result<Json<StoredProduct>, AppError> {
    validate(&product)?;
    let updated = state
        .catalog
        .update(&id, product)
        .await
        .ok_or_else(|| AppError::not_found(&id))?;
    tracing::info!(id = %id, version = updated.version, "Updated product");
    Ok(Json(updated))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.catalog.delete(&id).await {
        return Err(AppError::not_found(&id));
    }
    tracing::info!(id = %id, "Deleted product");
    Ok(StatusCode::NO_CONTENT)
}

fn validate(product: &StoredProduct) -> Result<(), AppError> {
    if product.name.trim().is_empty() {
        return Err(AppError::bad_request("Product name is required"));
    }
    if product.status > 3 {
        return Err(AppError::bad_request("Product status must be in 0..=3"));
    }
    Ok(())
}
