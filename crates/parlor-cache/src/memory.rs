// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process recency cache.
//!
//! Each room holds a capped live tail and a bounded scratch region of older
//! pages, both oldest-first. Messages evicted from the tail move to the end
//! of scratch, so `scratch ++ tail` stays one sorted run of history.
//!
//! A room becomes readable only once [`warm`](RecencyCache::warm) has merged a
//! store snapshot into it. Writes that arrive earlier are held in a pending
//! entry, which closes the gap between a join's store read and its warm.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use tokio::time::Instant;
use tracing::debug;

use parlor_config::model::CacheConfig;
use parlor_core::{
    AdapterType, HealthStatus, Message, MessageId, ParlorError, PluginAdapter, RecencyCache,
    RoomId,
};

#[derive(Debug)]
struct RoomEntry {
    tail: VecDeque<Message>,
    scratch: VecDeque<Message>,
    /// Set once a store snapshot has been merged in.
    ready: bool,
    expires_at: Instant,
}

impl RoomEntry {
    fn pending(expires_at: Instant) -> Self {
        Self {
            tail: VecDeque::new(),
            scratch: VecDeque::new(),
            ready: false,
            expires_at,
        }
    }

    fn oldest_id(&self) -> Option<MessageId> {
        self.scratch
            .front()
            .or_else(|| self.tail.front())
            .map(|m| m.id)
    }

    fn contains(&self, id: MessageId) -> bool {
        let by_id = |m: &Message| m.id.cmp(&id);
        self.tail.binary_search_by(by_id).is_ok() || self.scratch.binary_search_by(by_id).is_ok()
    }

    /// Move overflow from the tail into scratch, then cap scratch from its old end.
    fn enforce_bounds(&mut self, max_entries: usize, max_backfill: usize) {
        while self.tail.len() > max_entries {
            if let Some(evicted) = self.tail.pop_front() {
                self.scratch.push_back(evicted);
            }
        }
        while self.scratch.len() > max_backfill {
            self.scratch.pop_front();
        }
    }
}

fn insert_sorted(list: &mut VecDeque<Message>, message: Message) {
    let pos = list.partition_point(|m| m.id < message.id);
    list.insert(pos, message);
}

/// Per-process recency cache keyed by room.
///
/// Correct only when a single process writes a room; use the Redis backend
/// for a fleet.
pub struct MemoryCache {
    rooms: DashMap<RoomId, RoomEntry>,
    max_entries: usize,
    max_backfill: usize,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(max_entries: usize, max_backfill: usize, ttl: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            max_entries: max_entries.max(1),
            max_backfill,
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.max_entries,
            config.max_backfill,
            Duration::from_secs(config.ttl_secs),
        )
    }

    /// Number of rooms currently held, expired or not.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// The room's unexpired entry with its horizon refreshed.
    ///
    /// An expired entry is dropped on the way.
    fn live_entry(&self, room: &RoomId) -> Option<RefMut<'_, RoomId, RoomEntry>> {
        let now = Instant::now();
        match self.rooms.get_mut(room) {
            Some(mut entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                return Some(entry);
            }
            Some(_) => {}
            None => return None,
        }
        self.rooms.remove_if(room, |_, entry| entry.expires_at <= now);
        None
    }

    /// The room's live entry if it has been warmed.
    fn ready_entry(&self, room: &RoomId) -> Option<RefMut<'_, RoomId, RoomEntry>> {
        self.live_entry(room).filter(|entry| entry.ready)
    }

    /// The room's live entry, starting a pending one when cold.
    ///
    /// Runs under a single shard lock: an expired entry is reset in place and
    /// a concurrent writer's fresh entry is never replaced.
    fn entry_or_pending(&self, room: &RoomId) -> RefMut<'_, RoomId, RoomEntry> {
        let now = Instant::now();
        let horizon = now + self.ttl;
        let mut entry = self
            .rooms
            .entry(room.clone())
            .and_modify(|entry| {
                if entry.expires_at <= now {
                    *entry = RoomEntry::pending(horizon);
                }
            })
            .or_insert_with(|| RoomEntry::pending(horizon));
        entry.expires_at = horizon;
        entry
    }
}

#[async_trait]
impl PluginAdapter for MemoryCache {
    fn name(&self) -> &str {
        "memory-cache"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        self.rooms.clear();
        Ok(())
    }
}

#[async_trait]
impl RecencyCache for MemoryCache {
    async fn read(&self, room: &RoomId) -> Result<Vec<Message>, ParlorError> {
        Ok(self
            .ready_entry(room)
            .map(|entry| entry.tail.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn read_before(
        &self,
        room: &RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError> {
        let Some(entry) = self.ready_entry(room) else {
            return Ok(Vec::new());
        };
        if !entry.contains(before) {
            return Ok(Vec::new());
        }

        let older: Vec<&Message> = entry
            .scratch
            .iter()
            .chain(entry.tail.iter())
            .take_while(|m| m.id < before)
            .collect();
        let skip = older.len().saturating_sub(limit);
        Ok(older.into_iter().skip(skip).cloned().collect())
    }

    async fn write(&self, room: &RoomId, message: &Message) -> Result<(), ParlorError> {
        let mut entry = self.entry_or_pending(room);
        if entry.contains(message.id) {
            return Ok(());
        }
        if entry.ready && entry.oldest_id().is_some_and(|oldest| message.id < oldest) {
            debug!(room = %room, id = %message.id, "write below cached span; skipped");
            return Ok(());
        }

        if entry.scratch.back().is_some_and(|newest| message.id < newest.id) {
            insert_sorted(&mut entry.scratch, message.clone());
        } else {
            insert_sorted(&mut entry.tail, message.clone());
        }
        entry.enforce_bounds(self.max_entries, self.max_backfill);
        Ok(())
    }

    async fn warm(&self, room: &RoomId, messages: &[Message]) -> Result<(), ParlorError> {
        let mut guard = self.entry_or_pending(room);
        let entry = &mut *guard;

        let mut merged: Vec<Message> = entry
            .scratch
            .drain(..)
            .chain(entry.tail.drain(..))
            .chain(messages.iter().cloned())
            .collect();
        merged.sort_by_key(|m| m.id);
        merged.dedup_by_key(|m| m.id);

        let split = merged.len().saturating_sub(self.max_entries);
        entry.tail = merged.split_off(split).into();
        entry.scratch = merged.into();
        entry.enforce_bounds(self.max_entries, self.max_backfill);
        entry.ready = true;
        Ok(())
    }

    async fn backfill(
        &self,
        room: &RoomId,
        before: MessageId,
        older: &[Message],
    ) -> Result<(), ParlorError> {
        let Some(mut entry) = self.ready_entry(room) else {
            return Ok(());
        };
        if entry.oldest_id() != Some(before) {
            debug!(room = %room, before = %before, "backfill page not contiguous; dropped");
            return Ok(());
        }
        if older.iter().any(|m| m.id >= before) || !older.windows(2).all(|w| w[0].id < w[1].id) {
            return Ok(());
        }

        for message in older.iter().rev() {
            entry.scratch.push_front(message.clone());
        }
        entry.enforce_bounds(self.max_entries, self.max_backfill);
        Ok(())
    }

    async fn invalidate(&self, room: &RoomId) -> Result<(), ParlorError> {
        if self.rooms.remove(room).is_some() {
            debug!(room = %room, "cache entry invalidated");
        }
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<usize, ParlorError> {
        let now = Instant::now();
        let before = self.rooms.len();
        self.rooms.retain(|_, entry| entry.expires_at > now);
        Ok(before.saturating_sub(self.rooms.len()))
    }
}
