//! WebSocket upgrade handler: attaches a client to the relay hub.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tracing::debug;

use crate::api::state::SharedState;
use crate::error::RelayError;

use super::manager::ConnectionId;
use super::messages::Frame;

/// GET /ws: upgrade to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Upper bound on a single write (or the closing handshake) to a client.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Core WebSocket session logic.
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (connection_id, mut rx) = state.hub.on_connect().await;
    let removed = rx.removed();
    let (mut sink, mut stream) = socket.split();

    // Writer task: drain this connection's queue into the WS sink until the
    // hub removes the connection or the client stops accepting data.
    let writer_removed = removed.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                _ = writer_removed.cancelled() => break,
                frame = rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            let text = Message::Text(frame.to_json().into());
            let sent = tokio::select! {
                biased;
                _ = writer_removed.cancelled() => break,
                sent = tokio::time::timeout(WRITE_TIMEOUT, sink.send(text)) => sent,
            };
            match sent {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(connection_id, "write failed: {e}");
                    break;
                }
                Err(_) => {
                    debug!(connection_id, "write timed out");
                    break;
                }
            }
        }
        let _ = tokio::time::timeout(WRITE_TIMEOUT, sink.close()).await;
    });

    // Reader task: relay client events through the hub.
    let reader_state = state.clone();
    let reader_removed = removed.clone();
    let idle_timeout = state.config.idle_timeout();
    let mut reader = tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                biased;
                _ = reader_removed.cancelled() => {
                    debug!(connection_id, "connection removed, stop reading");
                    break;
                }
                next = next_message(&mut stream, idle_timeout) => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    handle_client_message(&reader_state, connection_id, &text).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // Binary / Ping / Pong handled by Axum
                Some(Err(e)) => {
                    let err = RelayError::Connection(e.to_string());
                    debug!(connection_id, "{err}");
                    break;
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut writer => { reader.abort(); }
        _ = &mut reader => {
            // Let the writer send a close frame if the hub removed us.
            if removed.is_cancelled() {
                let _ = tokio::time::timeout(WRITE_TIMEOUT, &mut writer).await;
            }
            writer.abort();
        }
    }

    state.hub.on_disconnect(connection_id).await;
}

/// Next message from the client; `None` when the stream ends or the
/// connection has been idle longer than `idle_timeout`.
async fn next_message(
    stream: &mut SplitStream<WebSocket>,
    idle_timeout: Option<Duration>,
) -> Option<Result<Message, axum::Error>> {
    match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                debug!("idle timeout, closing connection");
                None
            }
        },
        None => stream.next().await,
    }
}

/// Process a client-sent text message.
async fn handle_client_message(state: &SharedState, connection_id: ConnectionId, text: &str) {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(err) => {
            debug!(connection_id, "invalid frame: {err}");
            state.hub.reply(connection_id, Frame::error(&err)).await;
            return;
        }
    };

    if frame.is_ping() {
        state.hub.reply(connection_id, Frame::pong()).await;
        return;
    }

    match state
        .hub
        .dispatch(Some(connection_id), &frame.event, frame.args)
        .await
    {
        Ok(_) => {}
        Err(err @ RelayError::MalformedPayload { .. }) => {
            state.hub.reply(connection_id, Frame::error(&err)).await;
        }
        // Unrecognized events have no listener, and a removed connection
        // has nobody left to tell; drop both quietly.
        Err(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
