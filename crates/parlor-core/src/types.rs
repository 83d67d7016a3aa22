// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the room protocol.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identity of an authenticated user, as issued by the external session store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Unique identifier for a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        RoomId(s.to_string())
    }
}

/// Store-assigned message identifier.
///
/// Monotonically increasing in creation order, so it doubles as the
/// pagination cursor and the canonical ordering key within a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room flavor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoomKind {
    /// Multi-member room, open or membership-restricted.
    Shared,
    /// Exactly two members, unique per unordered pair.
    Direct,
}

/// A chat room as recorded by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: Option<String>,
    pub kind: RoomKind,
    /// Only members may join when set. Always set for direct rooms.
    pub restricted: bool,
    pub members: Vec<UserId>,
    pub created_at: String,
}

impl Room {
    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.iter().any(|m| m == user)
    }

    /// Whether `user` may join and read this room.
    pub fn admits(&self, user: &UserId) -> bool {
        !(self.restricted || self.kind == RoomKind::Direct) || self.is_member(user)
    }

    /// Client-facing summary, labelled with the given display name.
    pub fn summary(&self, name: Option<String>) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            name: name.or_else(|| self.name.clone()),
            kind: self.kind,
            members: self.members.clone(),
        }
    }
}

/// Parameters for creating a room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub kind: RoomKind,
    pub members: Vec<UserId>,
    pub name: Option<String>,
    pub restricted: bool,
}

/// Room description pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: Option<String>,
    pub kind: RoomKind,
    pub members: Vec<UserId>,
}

/// An immutable chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub body: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub created_at: String,
}

/// An identity resolved from the external web session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Online/offline marker carried by presence events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Event propagated to every subscriber of a room across all processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvent {
    pub room_id: RoomId,
    /// Instance id of the publishing process.
    pub origin: String,
    #[serde(flatten)]
    pub payload: RoomEventPayload,
}

/// What happened in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEventPayload {
    /// A message was accepted and persisted.
    Message { message: Message },
    /// An identity joined or left the room's live session.
    Presence {
        user_id: UserId,
        status: PresenceStatus,
    },
}

impl RoomEvent {
    pub fn message(origin: &str, message: Message) -> Self {
        Self {
            room_id: message.room_id.clone(),
            origin: origin.to_string(),
            payload: RoomEventPayload::Message { message },
        }
    }

    pub fn presence(origin: &str, room_id: RoomId, user_id: UserId, status: PresenceStatus) -> Self {
        Self {
            room_id,
            origin: origin.to_string(),
            payload: RoomEventPayload::Presence { user_id, status },
        }
    }
}

/// Normalized key for an unordered member pair, used to keep direct rooms unique.
pub fn direct_pair_key(a: &UserId, b: &UserId) -> String {
    if a <= b {
        format!("{}|{}", a.0, b.0)
    } else {
        format!("{}|{}", b.0, a.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays in the subsystem.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Cache,
    Bus,
    Auth,
}
