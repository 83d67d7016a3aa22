// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire frames for the real-time channel.
//!
//! Client -> Server:
//! ```json
//! {"type": "join_room", "request_id": "1", "room_id": "r1"}
//! {"type": "send_message", "room_id": "r1", "body": "hi"}
//! {"type": "load_more_messages", "request_id": "2", "room_id": "r1", "before_message_id": 41}
//! {"type": "leave_room", "request_id": "3", "room_id": "r1"}
//! {"type": "create_direct_room", "request_id": "4", "member_id": "u2"}
//! ```
//!
//! Server -> Client:
//! ```json
//! {"type": "joined_room", "request_id": "1", "room_id": "r1", "history": [...]}
//! {"type": "message_received", "message": {...}}
//! {"type": "error", "request_id": "2", "error": {"code": "not_authorized", "message": "..."}}
//! ```

use parlor_core::{
    Message, MessageId, ParlorError, PresenceStatus, RoomId, RoomSummary, UserId,
};
use serde::{Deserialize, Serialize};

/// Frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinRoom {
        #[serde(default)]
        request_id: Option<String>,
        room_id: RoomId,
    },
    SendMessage {
        #[serde(default)]
        request_id: Option<String>,
        room_id: RoomId,
        body: String,
    },
    LoadMoreMessages {
        #[serde(default)]
        request_id: Option<String>,
        room_id: RoomId,
        before_message_id: MessageId,
    },
    LeaveRoom {
        #[serde(default)]
        request_id: Option<String>,
        room_id: RoomId,
    },
    CreateDirectRoom {
        #[serde(default)]
        request_id: Option<String>,
        member_id: UserId,
    },
}

impl ClientFrame {
    /// Parse a text frame. Malformed input is a validation failure.
    pub fn parse(text: &str) -> Result<Self, ParlorError> {
        serde_json::from_str(text)
            .map_err(|e| ParlorError::ValidationFailed(format!("malformed frame: {e}")))
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientFrame::JoinRoom { request_id, .. }
            | ClientFrame::SendMessage { request_id, .. }
            | ClientFrame::LoadMoreMessages { request_id, .. }
            | ClientFrame::LeaveRoom { request_id, .. }
            | ClientFrame::CreateDirectRoom { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Frame sent by the server, either as a reply or as a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    JoinedRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        room_id: RoomId,
        history: Vec<Message>,
    },
    MoreMessages {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        room_id: RoomId,
        messages: Vec<Message>,
    },
    LeftRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        room_id: RoomId,
    },
    DirectRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        room: RoomSummary,
    },
    MessageReceived {
        message: Message,
    },
    DirectRoomCreated {
        room: RoomSummary,
    },
    PresenceChanged {
        room_id: RoomId,
        user_id: UserId,
        status: PresenceStatus,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        error: ErrorBody,
    },
}

/// Structured error carried by [`ServerFrame::Error`] and REST error bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&ParlorError> for ErrorBody {
    fn from(err: &ParlorError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.client_message(),
        }
    }
}

impl ServerFrame {
    pub fn error(request_id: Option<String>, err: &ParlorError) -> Self {
        ServerFrame::Error {
            request_id,
            error: err.into(),
        }
    }

    /// Serialize for a text frame.
    pub fn to_json(&self) -> Result<String, ParlorError> {
        serde_json::to_string(self)
            .map_err(|e| ParlorError::Internal(format!("encode server frame: {e}")))
    }
}
