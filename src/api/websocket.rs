//! WebSocket handler for the duplex session channel.
//!
//! Each connection attaches to one named session. Inbound protocol messages
//! become registry operations; pump-delivered output and lifecycle events
//! become outbound protocol messages. The session name travels out-of-band
//! in the URL path; connections naming an unknown session are rejected.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::handlers::AppState;
use super::protocol::{ClientMessage, ServerMessage};
use crate::session::{OutputSink, SessionName};

/// Disconnect code sent when the session process ended or the attach was
/// rejected.
const DISCONNECT_CODE: i64 = 1;

/// Event queued by the pump for delivery over the socket.
enum SinkEvent {
    Output(Vec<u8>),
    Ended,
}

/// Sink handed to the registry on attach: forwards pump calls into the
/// connection's outbound queue. Send failures mean the connection is gone
/// and are deliberately dropped.
struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl OutputSink for ChannelSink {
    fn receive_output(&self, data: &[u8]) {
        let _ = self.tx.send(SinkEvent::Output(data.to_vec()));
    }

    fn notify_process_ended(&self) {
        let _ = self.tx.send(SinkEvent::Ended);
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, name))
}

/// Drive one session channel from attach to close.
async fn handle_socket(socket: WebSocket, state: AppState, raw_name: String) {
    let (mut outbound, mut inbound) = socket.split();

    let name = match raw_name.parse::<SessionName>() {
        Ok(name) => name,
        Err(_) => {
            warn!(name = %raw_name, "rejecting connection: invalid session name");
            let _ = send(&mut outbound, ServerMessage::Disconnect(DISCONNECT_CODE)).await;
            let _ = outbound.close().await;
            return;
        }
    };

    let (tx, mut events) = mpsc::unbounded_channel();
    let sink = Arc::new(ChannelSink { tx });

    if let Err(e) = state.registry.attach(name, sink) {
        warn!(session = %name, error = %e, "rejecting connection: attach failed");
        let _ = send(&mut outbound, ServerMessage::Disconnect(DISCONNECT_CODE)).await;
        let _ = outbound.close().await;
        return;
    }

    if send(&mut outbound, ServerMessage::Setup).await.is_err() {
        detach(&state, name).await;
        return;
    }

    info!(session = %name, "client attached");

    // Whether closing this connection should tear the session down. A
    // pre-empted connection must leave the session to its new owner.
    let mut terminate_on_close = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SinkEvent::Output(data)) => {
                    let text = String::from_utf8_lossy(&data).to_string();
                    if send(&mut outbound, ServerMessage::Stdout(text)).await.is_err() {
                        break;
                    }
                }
                Some(SinkEvent::Ended) => {
                    debug!(session = %name, "session process ended, disconnecting client");
                    let _ = send(&mut outbound, ServerMessage::Disconnect(DISCONNECT_CODE)).await;
                    break;
                }
                // Sink replaced by a newer attach, or the session was
                // explicitly terminated. Tell the client to stop, but leave
                // the session alone.
                None => {
                    debug!(session = %name, "connection pre-empted, closing client");
                    let _ = send(&mut outbound, ServerMessage::Disconnect(DISCONNECT_CODE)).await;
                    terminate_on_close = false;
                    break;
                }
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    handle_inbound(&state, name, &text).await;
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = outbound.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(session = %name, "client closed connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session = %name, error = %e, "websocket error");
                    break;
                }
            },
        }
    }

    let _ = outbound.close().await;

    if terminate_on_close {
        detach(&state, name).await;
    }
}

/// Translate one inbound message into a registry operation.
///
/// Malformed messages and I/O failures against a dying process are logged
/// and skipped; they must never take the handler down.
async fn handle_inbound(state: &AppState, name: SessionName, text: &str) {
    match ClientMessage::from_json(text) {
        Ok(ClientMessage::Stdin(data)) => {
            if let Err(e) = state.registry.write(name, data.as_bytes()).await {
                warn!(session = %name, error = %e, "write to session failed");
            }
        }
        Ok(ClientMessage::SetSize { rows, cols }) => {
            if let Err(e) = state.registry.resize(name, rows, cols).await {
                warn!(session = %name, error = %e, "resize failed");
            }
        }
        Err(e) => {
            warn!(session = %name, error = %e, "ignoring malformed message");
        }
    }
}

/// Initiate session teardown after the channel closed. Fire-and-forget:
/// the reaping wait happens off this connection's back.
async fn detach(state: &AppState, name: SessionName) {
    let registry = Arc::clone(&state.registry);
    tokio::spawn(async move {
        match registry.terminate(name, false).await {
            Ok(()) => debug!(session = %name, "session torn down after close"),
            // Already removed (e.g. explicit DELETE raced the close)
            Err(e) => debug!(session = %name, error = %e, "teardown skipped"),
        }
    });
}

async fn send(
    outbound: &mut SplitSink<WebSocket, Message>,
    message: ServerMessage,
) -> Result<(), axum::Error> {
    outbound.send(Message::Text(message.to_json().into())).await
}
