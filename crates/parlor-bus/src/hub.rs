// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-process room hub: maps rooms to local broadcast channels.

use dashmap::DashMap;
use parlor_core::{RoomEvent, RoomId};
use tokio::sync::broadcast;
use tracing::trace;

/// Room topics with at least one subscriber on this process.
///
/// Each room gets its own channel so events stay isolated between rooms.
/// Receivers that fall more than `capacity` events behind skip ahead.
pub struct RoomHub {
    topics: DashMap<RoomId, broadcast::Sender<RoomEvent>>,
    capacity: usize,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a room, creating its topic on first use.
    pub fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<RoomEvent> {
        self.topics
            .entry(room.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Hand an event to every local subscriber of its room.
    ///
    /// Returns the number of receivers reached. A topic found without
    /// receivers is dropped.
    pub fn deliver(&self, event: &RoomEvent) -> usize {
        let reached = match self.topics.get(&event.room_id) {
            Some(sender) => sender.send(event.clone()).unwrap_or(0),
            None => return 0,
        };
        if reached == 0 {
            self.release(&event.room_id);
        }
        trace!(room = %event.room_id, reached, "room event delivered");
        reached
    }

    /// Drop the room's topic if nobody is listening any more.
    pub fn release(&self, room: &RoomId) {
        self.topics
            .remove_if(room, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of rooms with a live topic.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of local receivers subscribed to `room`.
    pub fn subscriber_count(&self, room: &RoomId) -> usize {
        self.topics
            .get(room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::{PresenceStatus, UserId};

    fn event(room: &str) -> RoomEvent {
        RoomEvent::presence(
            "node-a",
            RoomId::from(room),
            UserId::from("u1"),
            PresenceStatus::Online,
        )
    }

    #[tokio::test]
    async fn events_reach_only_their_room() {
        let hub = RoomHub::new(16);
        let mut a = hub.subscribe(&RoomId::from("a"));
        let mut b = hub.subscribe(&RoomId::from("b"));

        assert_eq!(hub.deliver(&event("a")), 1);
        assert_eq!(a.recv().await.unwrap().room_id, RoomId::from("a"));
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn release_drops_idle_topics_only() {
        let hub = RoomHub::new(16);
        let room = RoomId::from("a");
        let first = hub.subscribe(&room);
        let second = hub.subscribe(&room);
        assert_eq!(hub.subscriber_count(&room), 2);

        drop(first);
        hub.release(&room);
        assert_eq!(hub.topic_count(), 1);

        drop(second);
        hub.release(&room);
        assert_eq!(hub.topic_count(), 0);
    }

    #[test]
    fn delivery_without_listeners_prunes_topic() {
        let hub = RoomHub::new(16);
        let room = RoomId::from("a");
        drop(hub.subscribe(&room));
        assert_eq!(hub.deliver(&event("a")), 0);
        assert_eq!(hub.topic_count(), 0);
    }
}
