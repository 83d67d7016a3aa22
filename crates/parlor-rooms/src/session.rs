// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection room session FSM.
//!
//! Each (connection, room) pair moves through
//! Unjoined -> Joining -> Joined -> Leaving -> Closed. A connection's frames
//! are handled one at a time in arrival order; each joined room gets a
//! forwarder task relaying bus events into the connection's outbound queue.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_core::{
    Identity, Message, MessageId, ParlorError, PresenceStatus, RoomEvent, RoomEventPayload,
    RoomId,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::presence::{ConnectionId, Endpoint};
use crate::protocol::{ClientFrame, ServerFrame};
use crate::service::RoomService;

/// States of one room within one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Unjoined,
    /// Authorization and subscription in progress.
    Joining,
    Joined,
    /// Explicit leave in progress.
    Leaving,
    Closed,
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomState::Unjoined => write!(f, "unjoined"),
            RoomState::Joining => write!(f, "joining"),
            RoomState::Joined => write!(f, "joined"),
            RoomState::Leaving => write!(f, "leaving"),
            RoomState::Closed => write!(f, "closed"),
        }
    }
}

struct RoomSlot {
    state: RoomState,
    forwarder: Option<CancellationToken>,
}

/// One authenticated connection and the rooms it has joined.
pub struct ConnectionSession {
    id: ConnectionId,
    identity: Identity,
    service: Arc<RoomService>,
    outbound: mpsc::Sender<ServerFrame>,
    rooms: HashMap<RoomId, RoomSlot>,
    closed: bool,
}

impl ConnectionSession {
    /// Start a session for an admitted identity and mark it present.
    pub fn open(
        service: Arc<RoomService>,
        identity: Identity,
        outbound: mpsc::Sender<ServerFrame>,
    ) -> Self {
        let id = Uuid::new_v4();
        service.presence().set(
            &identity.id,
            Endpoint {
                conn_id: id,
                outbound: outbound.clone(),
            },
        );
        info!(conn = %id, user = %identity.id, "connection session opened");
        Self {
            id,
            identity,
            service,
            outbound,
            rooms: HashMap::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self, room_id: &RoomId) -> RoomState {
        if self.closed {
            return RoomState::Closed;
        }
        self.rooms
            .get(room_id)
            .map(|slot| slot.state)
            .unwrap_or(RoomState::Unjoined)
    }

    /// Rooms currently in the `Joined` state.
    pub fn joined_rooms(&self) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|(_, slot)| slot.state == RoomState::Joined)
            .map(|(room, _)| room.clone())
            .collect()
    }

    /// Handle one client frame and produce the reply, if any.
    ///
    /// Accepted messages get no reply: the sender hears them back through
    /// the room's fan-out like every other subscriber.
    pub async fn handle(&mut self, frame: ClientFrame) -> Option<ServerFrame> {
        let request_id = frame.request_id().map(str::to_string);
        let result = match frame {
            ClientFrame::JoinRoom { room_id, .. } => {
                self.join(&room_id)
                    .await
                    .map(|history| {
                        Some(ServerFrame::JoinedRoom {
                            request_id: request_id.clone(),
                            room_id,
                            history,
                        })
                    })
            }
            ClientFrame::SendMessage { room_id, body, .. } => {
                self.send(&room_id, &body).await.map(|_| None)
            }
            ClientFrame::LoadMoreMessages {
                room_id,
                before_message_id,
                ..
            } => self
                .load_more(&room_id, before_message_id)
                .await
                .map(|messages| {
                    Some(ServerFrame::MoreMessages {
                        request_id: request_id.clone(),
                        room_id,
                        messages,
                    })
                }),
            ClientFrame::LeaveRoom { room_id, .. } => {
                self.leave(&room_id).await;
                Ok(Some(ServerFrame::LeftRoom {
                    request_id: request_id.clone(),
                    room_id,
                }))
            }
            ClientFrame::CreateDirectRoom { member_id, .. } => self
                .service
                .open_direct_room(&self.identity, &member_id)
                .await
                .map(|room| {
                    Some(ServerFrame::DirectRoom {
                        request_id: request_id.clone(),
                        room,
                    })
                }),
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                debug!(conn = %self.id, code = e.code(), error = %e, "request failed");
                Some(ServerFrame::error(request_id, &e))
            }
        }
    }

    /// Join a room and return its latest history.
    ///
    /// Joining an open room records membership. Joining a room that is
    /// already joined only re-sends history.
    pub async fn join(&mut self, room_id: &RoomId) -> Result<Vec<Message>, ParlorError> {
        if self.state(room_id) == RoomState::Joined {
            return self.service.history(room_id).await;
        }
        self.rooms.insert(
            room_id.clone(),
            RoomSlot {
                state: RoomState::Joining,
                forwarder: None,
            },
        );

        match self.enter(room_id).await {
            Ok(history) => {
                info!(conn = %self.id, user = %self.identity.id, room = %room_id, "room joined");
                self.service
                    .announce_presence(room_id, &self.identity.id, PresenceStatus::Online)
                    .await;
                Ok(history)
            }
            Err(e) => {
                if let Some(token) = self.rooms.remove(room_id).and_then(|slot| slot.forwarder) {
                    token.cancel();
                }
                Err(e)
            }
        }
    }

    async fn enter(&mut self, room_id: &RoomId) -> Result<Vec<Message>, ParlorError> {
        self.service.enroll(&self.identity.id, room_id).await?;
        // Subscribe before reading history so nothing published in between is missed.
        let forwarder = self.spawn_forwarder(room_id);
        if let Some(slot) = self.rooms.get_mut(room_id) {
            slot.forwarder = Some(forwarder);
            slot.state = RoomState::Joined;
        }
        self.service.history(room_id).await
    }

    /// Send a message to a joined room.
    pub async fn send(&mut self, room_id: &RoomId, body: &str) -> Result<Message, ParlorError> {
        self.require_joined(room_id)?;
        self.service.send(&self.identity.id, room_id, body).await
    }

    /// Page of messages older than `before` in a joined room.
    pub async fn load_more(
        &mut self,
        room_id: &RoomId,
        before: MessageId,
    ) -> Result<Vec<Message>, ParlorError> {
        self.require_joined(room_id)?;
        self.service.load_more(room_id, before).await
    }

    /// Leave a room. Leaving a room that was never joined does nothing.
    pub async fn leave(&mut self, room_id: &RoomId) {
        match self.rooms.get_mut(room_id) {
            Some(slot) if slot.state == RoomState::Joined => slot.state = RoomState::Leaving,
            _ => return,
        }
        self.release(room_id).await;
        info!(conn = %self.id, user = %self.identity.id, room = %room_id, "room left");
    }

    /// Tear the session down: leave every room and clear presence.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        let rooms: Vec<RoomId> = self.rooms.keys().cloned().collect();
        for room_id in &rooms {
            self.release(room_id).await;
        }
        self.closed = true;
        let last = self.service.presence().clear(&self.identity.id, self.id);
        info!(
            conn = %self.id,
            user = %self.identity.id,
            rooms = rooms.len(),
            last_connection = last,
            "connection session closed"
        );
    }

    async fn release(&mut self, room_id: &RoomId) {
        let Some(slot) = self.rooms.remove(room_id) else {
            return;
        };
        if let Some(token) = slot.forwarder {
            token.cancel();
        }
        self.service
            .announce_presence(room_id, &self.identity.id, PresenceStatus::Offline)
            .await;
    }

    fn require_joined(&self, room_id: &RoomId) -> Result<(), ParlorError> {
        match self.state(room_id) {
            RoomState::Joined => Ok(()),
            state => {
                trace!(conn = %self.id, room = %room_id, %state, "room not joined");
                Err(ParlorError::NotAuthorized(format!(
                    "room {room_id} has not been joined"
                )))
            }
        }
    }

    fn spawn_forwarder(&self, room_id: &RoomId) -> CancellationToken {
        let bus = self.service.bus().clone();
        let mut events = bus.subscribe(room_id);
        let outbound = self.outbound.clone();
        let room = room_id.clone();
        let conn = self.id;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => {
                            if outbound.send(frame_for(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(conn = %conn, room = %room, skipped, "subscriber lagged, events skipped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            drop(events);
            bus.release(&room);
            trace!(conn = %conn, room = %room, "forwarder stopped");
        });
        cancel
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        for slot in self.rooms.values() {
            if let Some(token) = &slot.forwarder {
                token.cancel();
            }
        }
        self.service.presence().clear(&self.identity.id, self.id);
        debug!(conn = %self.id, "connection session dropped without close");
    }
}

fn frame_for(event: RoomEvent) -> ServerFrame {
    match event.payload {
        RoomEventPayload::Message { message } => ServerFrame::MessageReceived { message },
        RoomEventPayload::Presence { user_id, status } => ServerFrame::PresenceChanged {
            room_id: event.room_id,
            user_id,
            status,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::{MessageId, UserId};

    #[test]
    fn bus_events_map_to_push_frames() {
        let message = Message {
            id: MessageId(3),
            room_id: RoomId::from("r1"),
            sender_id: UserId::from("u1"),
            sender_name: Some("Ana".to_string()),
            body: "hi".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        assert_eq!(
            frame_for(RoomEvent::message("node-a", message.clone())),
            ServerFrame::MessageReceived { message }
        );
        assert_eq!(
            frame_for(RoomEvent::presence(
                "node-a",
                RoomId::from("r1"),
                UserId::from("u2"),
                PresenceStatus::Offline,
            )),
            ServerFrame::PresenceChanged {
                room_id: RoomId::from("r1"),
                user_id: UserId::from("u2"),
                status: PresenceStatus::Offline,
            }
        );
    }

    #[test]
    fn state_names() {
        assert_eq!(RoomState::Joining.to_string(), "joining");
        assert_eq!(RoomState::Closed.to_string(), "closed");
    }
}
