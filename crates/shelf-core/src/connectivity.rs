//! Connectivity reporting and the reconnect listener that triggers drains.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::SyncEngine;
use crate::models::Credential;
use crate::remote::CatalogRemote;

/// Broadcasts connected/disconnected transitions.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_connected: bool) -> Self {
        Self {
            sender: Arc::new(watch::Sender::new(initially_connected)),
        }
    }

    /// Publish the latest status; repeated values are not re-broadcast.
    pub fn report(&self, connected: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            tracing::info!("Connectivity changed: {}", if connected { "online" } else { "offline" });
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Forward every connectivity value to the engine until the monitor is gone.
pub fn spawn_reconnect_listener<R>(
    engine: Arc<SyncEngine<R>>,
    mut receiver: watch::Receiver<bool>,
    credential: Credential,
) -> JoinHandle<()>
where
    R: CatalogRemote + 'static,
{
    tokio::spawn(async move {
        loop {
            let connected = *receiver.borrow_and_update();
            if let Some(report) = engine.connectivity_changed(connected, &credential).await {
                tracing::debug!("Reconnect drain report: {:?}", report);
            }
            if receiver.changed().await.is_err() {
                break;
            }
        }
    })
}
