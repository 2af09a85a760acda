//! WebSocket upgrade handler and per-connection tasks
//!
//! Each accepted socket gets three pieces of work:
//!
//! - the read loop (runs on the upgrade task itself), decoding frames and
//!   handing them to the [`Session`];
//! - a writer task draining the outbound queue into the socket;
//! - a keepalive task queueing a Ping on every tick.
//!
//! They coordinate only through the connection's close signal. Whichever
//! path fails first closes the connection; the others notice and stop. A
//! writer blocked on a peer that stopped reading is abandoned mid-send, and
//! one that still has not finished after [`CLOSE_GRACE`] is aborted.

use crate::app::AppState;
use crate::auth::{Authenticated, Identity};
use crate::error::RelayError;
use super::connection::Connection;
use super::message::Message;
use super::registry::RoomRegistry;
use super::session::Session;
use axum::{
    extract::{
        State,
        ws::{self, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// How long a closing connection's writer gets to flush its Close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// `GET /ws`
///
/// Authentication runs as an extractor ahead of the upgrade, so a missing or
/// invalid credential is answered with 401 and nothing is registered. The
/// origin is checked next; only then is the handshake itself validated.
pub async fn ws_handler(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.config.cors.origin_allowed(origin) {
        return RelayError::forbidden("Origin not allowed").into_response();
    }

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::debug!(user_id = %identity.id, error = %rejection, "Invalid WebSocket handshake");
            return rejection.into_response();
        }
    };

    let max_frame_size = state.config.websocket.max_frame_size;
    upgrade
        .max_message_size(max_frame_size)
        .max_frame_size(max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Drive one upgraded socket until it closes
pub async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let settings = state.config.websocket.clone();
    let registry = state.session.registry().clone();

    let (tx, rx) = mpsc::channel::<Message>(settings.channel_capacity);
    let conn = Arc::new(Connection::new(identity, tx));
    let (mut ws_sender, ws_receiver) = socket.split();

    if let Err(e) = registry.register(&conn) {
        tracing::warn!(conn_id = %conn.id(), user_id = %conn.user_id(), error = %e, "Failed to register connection");
        let _ = ws_sender
            .send(ws::Message::Close(Some(ws::CloseFrame {
                code: ws::close_code::AGAIN,
                reason: ws::Utf8Bytes::from_static("connection limit reached"),
            })))
            .await;
        let _ = ws_sender.close().await;
        return;
    }

    tracing::info!(
        conn_id = %conn.id(),
        user_id = %conn.user_id(),
        name = %conn.identity().display_name,
        "WebSocket connected"
    );

    let mut writer = tokio::spawn(write_loop(conn.clone(), registry.clone(), ws_sender, rx));
    let keepalive = tokio::spawn(keepalive_loop(
        conn.clone(),
        registry.clone(),
        settings.ping_interval(),
    ));

    let reason = read_loop(&conn, &state.session, ws_receiver, settings.read_timeout()).await;
    registry.close_connection(&conn, reason);

    keepalive.abort();
    if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        tracing::debug!(conn_id = %conn.id(), user_id = %conn.user_id(), "Writer still busy after close, aborting");
        writer.abort();
    }
}

async fn read_loop(
    conn: &Arc<Connection>,
    session: &Session,
    mut stream: SplitStream<WebSocket>,
    read_timeout: Duration,
) -> &'static str {
    loop {
        // Any inbound frame, data or Pong, resets the deadline
        let next = tokio::select! {
            _ = conn.closed() => return "closed",
            next = tokio::time::timeout(read_timeout, stream.next()) => next,
        };

        let msg = match next {
            Err(_) => {
                tracing::info!(conn_id = %conn.id(), user_id = %conn.user_id(), "Read deadline expired");
                return "read deadline expired";
            }
            Ok(None) => return "client disconnected",
            Ok(Some(Err(e))) => {
                tracing::debug!(conn_id = %conn.id(), user_id = %conn.user_id(), error = %e, "WebSocket read failed");
                return "read failed";
            }
            Ok(Some(Ok(msg))) => Message::from_axum(msg),
        };

        match msg {
            Message::Text(text) => {
                if let Err(e) = session.handle_frame(conn, &text).await {
                    tracing::warn!(conn_id = %conn.id(), user_id = %conn.user_id(), error = %e, "Closing connection after failed frame");
                    return match e {
                        RelayError::Protocol(_) => "protocol error",
                        _ => "dispatch failed",
                    };
                }
            }
            Message::Binary(_) => {
                tracing::warn!(conn_id = %conn.id(), user_id = %conn.user_id(), "Binary frames are not supported");
                return "protocol error";
            }
            // Pings are answered by the socket itself
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return "client closed",
        }
    }
}

async fn write_loop(
    conn: Arc<Connection>,
    registry: Arc<RoomRegistry>,
    mut sink: SplitSink<WebSocket, ws::Message>,
    mut rx: mpsc::Receiver<Message>,
) {
    loop {
        tokio::select! {
            biased;
            _ = conn.closed() => break,
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                // A peer that stopped reading can park this send forever
                let sent = tokio::select! {
                    biased;
                    _ = conn.closed() => break,
                    sent = sink.send(msg.into_axum()) => sent,
                };
                if let Err(e) = sent {
                    tracing::debug!(conn_id = %conn.id(), user_id = %conn.user_id(), error = %e, "WebSocket write failed");
                    registry.close_connection(&conn, "write failed");
                    break;
                }
            }
        }
    }

    let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
}

async fn keepalive_loop(conn: Arc<Connection>, registry: Arc<RoomRegistry>, every: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);

    loop {
        tokio::select! {
            _ = conn.closed() => break,
            _ = ticker.tick() => {
                if let Err(e) = conn.try_send(Message::Ping(Vec::new())) {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "Keepalive ping failed");
                    registry.close_connection(&conn, "keepalive failed");
                    break;
                }
            }
        }
    }
}
