// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-process fan-out bus.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::ParlorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{RoomEvent, RoomId};

/// Adapter for publishing room events to every process in the fleet.
///
/// Delivery is at-least-once and carries no ordering guarantee across
/// publishers; the store's message ids remain the canonical order.
#[async_trait]
pub trait FanoutBus: PluginAdapter {
    /// Publish an event to all subscribers of `event.room_id`, on any process.
    async fn publish(&self, event: RoomEvent) -> Result<(), ParlorError>;

    /// Subscribe the calling connection to a room's events on this process.
    fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<RoomEvent>;

    /// Signal that a subscriber for `room` went away so idle topics can be dropped.
    fn release(&self, room: &RoomId);
}
