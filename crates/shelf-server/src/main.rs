use std::sync::Arc;

use shelf_server::{app_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shelf_server=info".parse().expect("valid directive")),
        )
        .init();

    let config = Arc::new(ServerConfig::from_env()?);
    tracing::info!("Starting shelf-server with config: {:?}", config);

    let state = AppState::from_config(config);
    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("shelf-server listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
