// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for the real-time room channel.
//!
//! Frames are JSON text tagged by `type`; see [`parlor_rooms::protocol`].

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use parlor_core::Identity;
use parlor_rooms::{ClientFrame, ConnectionSession, ServerFrame};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::server::GatewayState;

/// Outbound queue depth per connection.
const OUTBOUND_CAPACITY: usize = 64;

/// WebSocket upgrade handler.
///
/// The session is resolved before upgrading; a request without one gets a
/// plain 401 and no socket.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.gate.origin_allowed(&headers) {
        debug!("websocket origin rejected");
        return StatusCode::FORBIDDEN.into_response();
    }
    let identity =
        match authenticate(state.resolver.as_ref(), &state.gate, &headers, &uri).await {
            Ok(identity) => identity,
            Err(e) => return ApiError(e).into_response(),
        };
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Serve one admitted connection.
///
/// A writer task drains the outbound queue into the socket while this task
/// reads frames and handles them one at a time, in arrival order.
async fn handle_socket(socket: WebSocket, state: GatewayState, identity: Identity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(OUTBOUND_CAPACITY);
    let mut session = ConnectionSession::open(state.service.clone(), identity, tx.clone());
    let conn = session.id();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match frame.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "dropping unencodable frame");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let reply = match msg {
            Message::Text(text) => match ClientFrame::parse(text.as_str()) {
                Ok(frame) => session.handle(frame).await,
                Err(e) => {
                    debug!(conn = %conn, error = %e, "invalid frame");
                    Some(ServerFrame::error(None, &e))
                }
            },
            Message::Close(_) => break,
            // Binary is unused; ping/pong is answered by the protocol layer.
            _ => None,
        };
        if let Some(reply) = reply {
            if tx.send(reply).await.is_err() {
                break;
            }
        }
    }

    session.close().await;
    drop(tx);
    writer.abort();
    debug!(conn = %conn, "websocket closed");
}
