//! Push channel: server notifications about records changed elsewhere.
//!
//! The client authenticates with an `authorization` frame right after the
//! websocket handshake; afterwards the server sends `created` and `updated`
//! frames carrying full records.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::{Error, Result};
use crate::models::{Credential, Product};

const EVENT_BUFFER: usize = 64;

/// An inbound notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum PushEvent {
    Created(Product),
    Updated(Product),
}

impl PushEvent {
    pub const fn product(&self) -> &Product {
        match self {
            Self::Created(product) | Self::Updated(product) => product,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
        }
    }
}

/// Parse a text frame into an event.
pub fn decode_frame(text: &str) -> Result<PushEvent> {
    serde_json::from_str(text).map_err(|error| Error::Push(format!("bad frame: {error}")))
}

/// First frame sent on every connection.
pub fn authorization_frame(credential: &Credential) -> String {
    serde_json::json!({
        "type": "authorization",
        "payload": { "token": credential.expose() },
    })
    .to_string()
}

/// Opens push connections.
pub struct PushChannel;

impl PushChannel {
    /// Connect, authenticate and start forwarding events.
    ///
    /// Reconnecting after a close is left to the caller.
    pub async fn connect(url: &str, credential: &Credential) -> Result<PushSubscription> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|error| Error::Push(format!("connect to {url} failed: {error}")))?;
        let (mut sink, mut source) = stream.split();

        sink.send(Message::Text(authorization_frame(credential)))
            .await
            .map_err(|error| Error::Push(format!("authorization frame failed: {error}")))?;
        tracing::info!("Push channel connected to {}", url);

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        sink.send(Message::Close(None)).await.ok();
                        break;
                    }
                    frame = source.next() => match frame {
                        Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                            Ok(event) => {
                                tracing::debug!("Push event received: {}", event.kind());
                                if events_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(error) => tracing::warn!("Ignoring push frame: {}", error),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!("Push channel closed by server: {:?}", frame);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            tracing::warn!("Push channel error: {}", error);
                            break;
                        }
                        None => {
                            tracing::info!("Push channel stream ended");
                            break;
                        }
                    },
                }
            }
        });

        Ok(PushSubscription {
            events: events_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// A live push connection.
///
/// Dropping the subscription closes the socket.
pub struct PushSubscription {
    events: mpsc::Receiver<PushEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushSubscription {
    /// Next event, `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Close the connection and wait for the reader task to finish.
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!("Push reader task failed: {}", error);
            }
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
    }
}
