// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recency cache: a bounded, expiring accelerator over the room store.

use async_trait::async_trait;

use crate::error::ParlorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Message, MessageId, RoomId};

/// Adapter for the per-room recency cache.
///
/// The cache keeps two regions per room:
/// - the **live tail**, at most `max_entries` of the most recent messages,
///   always a suffix of the store's history, returned by [`read`](Self::read);
/// - a bounded **scratch** region of older pages fetched during pagination,
///   kept contiguous with the tail and only consulted by
///   [`read_before`](Self::read_before).
///
/// Entries expire after a sliding horizon refreshed by every read or write.
/// Implementations never own data: an evicted entry is rebuilt from the store.
#[async_trait]
pub trait RecencyCache: PluginAdapter {
    /// The live tail, oldest-first. Empty when cold or expired.
    async fn read(&self, room: &RoomId) -> Result<Vec<Message>, ParlorError>;

    /// Up to `limit` cached messages strictly older than `before`, oldest-first.
    ///
    /// Returns an empty list unless `before` is itself cached, since only then
    /// is the cached span known to be gap-free up to the cursor.
    async fn read_before(
        &self,
        room: &RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError>;

    /// Record a newly persisted message.
    ///
    /// On a cold room the message is held as pending: reads keep reporting
    /// the room as cold until the next [`warm`](Self::warm) merges it in.
    async fn write(&self, room: &RoomId, message: &Message) -> Result<(), ParlorError>;

    /// Populate the live tail from a store query (oldest-first input).
    async fn warm(&self, room: &RoomId, messages: &[Message]) -> Result<(), ParlorError>;

    /// Extend the scratch region with a page that ends right before `before`.
    ///
    /// Pages that are not contiguous with the oldest cached message are dropped.
    async fn backfill(
        &self,
        room: &RoomId,
        before: MessageId,
        older: &[Message],
    ) -> Result<(), ParlorError>;

    /// Drop everything cached for `room` so the next read reports it cold.
    ///
    /// Called after a failed write, since the tail may now be missing a
    /// persisted message.
    async fn invalidate(&self, room: &RoomId) -> Result<(), ParlorError>;

    /// Reclaim entries whose horizon has lapsed. Returns how many were removed.
    async fn sweep_expired(&self) -> Result<usize, ParlorError>;
}
