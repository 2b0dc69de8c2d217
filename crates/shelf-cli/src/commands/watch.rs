use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use shelf_core::{
    spawn_reconnect_listener, ClientConfig, ConnectivityMonitor, PushChannel, PushDisposition,
    PushEvent, PushSubscription,
};

use crate::commands::common::Session;
use crate::error::CliError;

/// Probe connectivity on an interval, drain on reconnect and follow the push
/// channel until Ctrl-C.
pub async fn run_watch(
    interval: Duration,
    config: &ClientConfig,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    let Session {
        engine,
        client,
        credential,
        connected,
    } = Session::open(config, db_path, offline).await?;
    let engine = Arc::new(engine);
    let push_url = config.resolved_push_url();

    let monitor = ConnectivityMonitor::new(false);
    let listener = spawn_reconnect_listener(
        Arc::clone(&engine),
        monitor.subscribe(),
        credential.clone(),
    );
    monitor.report(connected);

    println!("Watching {} (Ctrl-C to stop)", client.base_url());
    let mut subscription: Option<PushSubscription> = None;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let connected = !offline && client.probe().await;
                monitor.report(connected);

                if !connected {
                    if let Some(mut closing) = subscription.take() {
                        closing.close().await;
                    }
                } else if subscription.is_none() {
                    match PushChannel::connect(&push_url, &credential).await {
                        Ok(opened) => subscription = Some(opened),
                        Err(error) => tracing::warn!("Push channel unavailable: {}", error),
                    }
                }
            }
            event = next_event(&mut subscription) => match event {
                Some(event) => print_push(&event, engine.handle_push(event.clone()).await),
                None => {
                    tracing::info!("Push channel closed, reconnecting on next probe");
                    subscription = None;
                }
            },
        }
    }

    if let Some(mut closing) = subscription.take() {
        closing.close().await;
    }
    drop(monitor);
    if let Err(error) = listener.await {
        tracing::warn!("Reconnect listener failed: {}", error);
    }
    Ok(())
}

async fn next_event(subscription: &mut Option<PushSubscription>) -> Option<PushEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn print_push(event: &PushEvent, disposition: PushDisposition) {
    let product = event.product();
    let note = match disposition {
        PushDisposition::Applied => "applied",
        PushDisposition::Ignored => "ignored",
        PushDisposition::SkippedPending => "kept local edits",
    };
    println!(
        "{} {} {} ({note})",
        event.kind(),
        product.id().unwrap_or("-"),
        product.name
    );
}
