use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use shelf_core::remote::CatalogRemote;
use shelf_core::{
    ClientConfig, Credential, EngineOptions, Error, FetchOutcome, LocalStore, Product,
    PushChannel, PushDisposition, PushEvent, PushPolicy, RemoteCatalogClient, SyncEngine,
    SyncStatus,
};
use shelf_server::{app_router, AppState, ServerConfig};

struct TestServer {
    config: ClientConfig,
    state: AppState,
}

async fn spawn_server(tokens: &[&str]) -> TestServer {
    let server_config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        tokens: tokens.iter().map(|token| (*token).to_string()).collect(),
    };
    let state = AppState::from_config(Arc::new(server_config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        config: ClientConfig::new(format!("http://{addr}")).unwrap(),
        state,
    }
}

async fn engine_for(
    server: &TestServer,
    options: EngineOptions,
) -> SyncEngine<RemoteCatalogClient> {
    let client = RemoteCatalogClient::new(&server.config).unwrap();
    let store = LocalStore::open_in_memory().await.unwrap();
    SyncEngine::new(Arc::new(client), store, options)
}

fn credential() -> Credential {
    Credential::new("integration-token").unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_edits_reach_the_service_after_reconnect() {
    let server = spawn_server(&[]).await;
    let engine = engine_for(&server, EngineOptions::default()).await;

    engine.connectivity_changed(false, &credential()).await;
    let saved = engine
        .save(Product::new("Pepsi", "cola", "8"), false, &credential())
        .await
        .unwrap()
        .product;
    assert_eq!(saved.status, SyncStatus::PendingCreate);

    let report = engine
        .connectivity_changed(true, &credential())
        .await
        .unwrap();
    assert_eq!(report.created, 1);

    let remote = engine.remote().list(&credential()).await.unwrap();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].name, "Pepsi");
    assert_eq!(remote[0].description, "cola");
    assert_eq!(remote[0].price, "8");

    let local = &engine.state().records[0];
    assert_eq!(local.status, SyncStatus::Clean);
    assert_eq!(local.id, remote[0].id);
    assert!(engine.store().keys().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn online_edit_and_delete_round_trip() {
    let server = spawn_server(&[]).await;
    let engine = engine_for(&server, EngineOptions::default()).await;

    let created = engine
        .save(Product::new("Cola", "", "5"), true, &credential())
        .await
        .unwrap();
    assert!(created.synced);

    let edited = engine
        .save(
            Product {
                price: "6".to_string(),
                ..created.product.clone()
            },
            true,
            &credential(),
        )
        .await
        .unwrap()
        .product;
    assert_eq!(edited.version, 1);

    assert_eq!(
        engine.fetch_all(&credential()).await,
        FetchOutcome::Remote { count: 1 }
    );
    assert_eq!(engine.state().records[0].price, "6");

    engine.delete(&edited, true, &credential()).await.unwrap();
    let error = engine
        .remote()
        .get(&credential(), edited.id().unwrap())
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_credentials_surface_as_service_errors() {
    let server = spawn_server(&["only-this-one"]).await;
    let client = RemoteCatalogClient::new(&server.config).unwrap();

    let error = client.list(&credential()).await.unwrap_err();

    assert!(matches!(error, Error::Service { status: 401, .. }));
    assert!(client.probe().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn push_events_are_merged_when_enabled() {
    let server = spawn_server(&[]).await;
    let engine = engine_for(
        &server,
        EngineOptions {
            push_policy: PushPolicy::MergeWhenClean,
            ..EngineOptions::default()
        },
    )
    .await;

    let mut subscription = PushChannel::connect(&server.config.resolved_push_url(), &credential())
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.state.catalog.subscriber_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // Another client creates a product.
    let other = RemoteCatalogClient::new(&server.config).unwrap();
    let created = other
        .create(&credential(), &Product::new("Fanta", "", "6"))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, PushEvent::Created(ref product) if product.id == created.id));

    assert_eq!(engine.handle_push(event).await, PushDisposition::Applied);
    assert_eq!(engine.state().records[0].name, "Fanta");

    subscription.close().await;
}
