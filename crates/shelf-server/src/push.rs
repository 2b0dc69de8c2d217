//! Websocket push endpoint.
//!
//! A subscriber must send an `authorization` frame first; only then does it
//! start receiving `created`/`updated` frames.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::routes::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
enum ClientFrame {
    Authorization { token: String },
}

pub async fn push_socket(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| serve_subscriber(state, socket))
}

async fn serve_subscriber(state: AppState, mut socket: WebSocket) {
    let authorized = await_authorization(&mut socket)
        .await
        .is_some_and(|token| state.config.accepts(&token));
    if !authorized {
        tracing::warn!("Push subscriber rejected: missing or invalid authorization");
        socket.send(Message::Close(None)).await.ok();
        return;
    }

    let mut changes = state.catalog.subscribe();
    tracing::info!(
        subscribers = state.catalog.subscriber_count(),
        "Push subscriber authorized"
    );
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(frame) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(error) => {
                            tracing::warn!("Failed to encode push frame: {}", error);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Push subscriber lagging, frames dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("Push subscriber disconnected");
}

async fn await_authorization(socket: &mut WebSocket) -> Option<String> {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => return parse_authorization(text.as_str()),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

fn parse_authorization(text: &str) -> Option<String> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Authorization { token }) => Some(token),
        Err(error) => {
            tracing::debug!("Unexpected first push frame: {}", error);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authorization_frame() {
        assert_eq!(
            parse_authorization(r#"{"type":"authorization","payload":{"token":"abc"}}"#),
            Some("abc".to_string())
        );
        assert_eq!(parse_authorization(r#"{"type":"hello"}"#), None);
        assert_eq!(parse_authorization("garbage"), None);
    }
}
