// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable room and message store: the authoritative record.

use async_trait::async_trait;

use crate::error::ParlorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Identity, Message, MessageId, NewRoom, Room, RoomId, UserId};

/// Adapter for the authoritative room, membership, and message store.
///
/// Every read and write is scoped to a single room. Message ids are assigned
/// by the store in creation order; list operations return oldest-first.
#[async_trait]
pub trait RoomStore: PluginAdapter {
    /// Fetch a room with its member list.
    async fn get_room(&self, id: &RoomId) -> Result<Option<Room>, ParlorError>;

    /// Find the direct room shared by two identities, in either order.
    async fn find_direct_room(&self, a: &UserId, b: &UserId) -> Result<Option<Room>, ParlorError>;

    /// Create a room. A second direct room for the same pair is rejected with
    /// [`ParlorError::Conflict`].
    async fn create_room(&self, room: NewRoom) -> Result<Room, ParlorError>;

    /// Atomically return the pair's direct room, creating it when absent.
    ///
    /// The boolean is `true` when this call created the room.
    async fn find_or_create_direct_room(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<(Room, bool), ParlorError>;

    /// Find a shared room by display name, creating an open one when absent.
    async fn ensure_shared_room(&self, name: &str) -> Result<Room, ParlorError>;

    /// Add a member to a room. Adding an existing member is a no-op.
    async fn add_member(&self, room: &RoomId, user: &UserId) -> Result<(), ParlorError>;

    /// Persist a message with a store-assigned id and timestamp.
    async fn append_message(
        &self,
        room: &RoomId,
        sender: &UserId,
        body: &str,
    ) -> Result<Message, ParlorError>;

    /// The newest `limit` messages, oldest-first.
    async fn list_recent(&self, room: &RoomId, limit: usize) -> Result<Vec<Message>, ParlorError>;

    /// Up to `limit` messages strictly older than `before`, oldest-first.
    async fn list_before(
        &self,
        room: &RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError>;

    /// Look up an identity in the directory maintained by the web application.
    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, ParlorError>;
}
