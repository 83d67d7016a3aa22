// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed recency cache shared by every process in the fleet.
//!
//! Per room, three keys with the same sliding expiry:
//! - `chat:{room}`: live tail, a sorted set scored by message id;
//! - `chat:{room}:older`: pagination scratch, same layout;
//! - `chat:{room}:ready`: present once a store snapshot has been merged.
//!
//! Multi-key updates run as Lua scripts so concurrent writers on different
//! processes never observe a half-applied eviction.

use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::{Client, Script};
use async_trait::async_trait;
use tracing::{debug, warn};

use parlor_config::model::CacheConfig;
use parlor_core::{
    AdapterType, HealthStatus, Message, MessageId, ParlorError, PluginAdapter, RecencyCache,
    RoomId,
};

const KEY_PREFIX: &str = "chat:";

/// KEYS: tail, scratch, ready. ARGV: id, json, max_entries, max_backfill, ttl.
const WRITE_SCRIPT: &str = r#"
local id = tonumber(ARGV[1])
if redis.call('ZCOUNT', KEYS[1], id, id) > 0 or redis.call('ZCOUNT', KEYS[2], id, id) > 0 then
  return 0
end
if redis.call('EXISTS', KEYS[3]) == 1 then
  local oldest = redis.call('ZRANGE', KEYS[2], 0, 0, 'WITHSCORES')
  if #oldest == 0 then oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES') end
  if #oldest > 0 and id < tonumber(oldest[2]) then return 0 end
end
local newest_scratch = redis.call('ZRANGE', KEYS[2], -1, -1, 'WITHSCORES')
if #newest_scratch > 0 and id < tonumber(newest_scratch[2]) then
  redis.call('ZADD', KEYS[2], id, ARGV[2])
else
  redis.call('ZADD', KEYS[1], id, ARGV[2])
end
local overflow = redis.call('ZCARD', KEYS[1]) - tonumber(ARGV[3])
if overflow > 0 then
  local evicted = redis.call('ZPOPMIN', KEYS[1], overflow)
  for i = 1, #evicted, 2 do
    redis.call('ZADD', KEYS[2], evicted[i + 1], evicted[i])
  end
end
redis.call('ZREMRANGEBYRANK', KEYS[2], 0, -(tonumber(ARGV[4]) + 1))
for i = 1, 3 do redis.call('EXPIRE', KEYS[i], ARGV[5]) end
return 1
"#;

/// KEYS: tail, scratch, ready. ARGV: max_entries, max_backfill, ttl, then id/json pairs.
const WARM_SCRIPT: &str = r#"
for i = 4, #ARGV, 2 do
  local id = tonumber(ARGV[i])
  if redis.call('ZCOUNT', KEYS[1], id, id) == 0 and redis.call('ZCOUNT', KEYS[2], id, id) == 0 then
    redis.call('ZADD', KEYS[1], id, ARGV[i + 1])
  end
end
local overflow = redis.call('ZCARD', KEYS[1]) - tonumber(ARGV[1])
if overflow > 0 then
  local evicted = redis.call('ZPOPMIN', KEYS[1], overflow)
  for i = 1, #evicted, 2 do
    redis.call('ZADD', KEYS[2], evicted[i + 1], evicted[i])
  end
end
redis.call('ZREMRANGEBYRANK', KEYS[2], 0, -(tonumber(ARGV[2]) + 1))
redis.call('SET', KEYS[3], '1')
for i = 1, 3 do redis.call('EXPIRE', KEYS[i], ARGV[3]) end
return 1
"#;

/// KEYS: tail, scratch, ready. ARGV: before, max_backfill, ttl, then id/json pairs.
const BACKFILL_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[3]) == 0 then return 0 end
local oldest = redis.call('ZRANGE', KEYS[2], 0, 0, 'WITHSCORES')
if #oldest == 0 then oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES') end
if #oldest == 0 or tonumber(oldest[2]) ~= tonumber(ARGV[1]) then return 0 end
for i = 4, #ARGV, 2 do
  redis.call('ZADD', KEYS[2], ARGV[i], ARGV[i + 1])
end
redis.call('ZREMRANGEBYRANK', KEYS[2], 0, -(tonumber(ARGV[2]) + 1))
for i = 1, 3 do redis.call('EXPIRE', KEYS[i], ARGV[3]) end
return 1
"#;

struct RoomKeys {
    tail: String,
    scratch: String,
    ready: String,
}

impl RoomKeys {
    fn new(room: &RoomId) -> Self {
        let tail = format!("{KEY_PREFIX}{room}");
        Self {
            scratch: format!("{tail}:older"),
            ready: format!("{tail}:ready"),
            tail,
        }
    }
}

fn encode(message: &Message) -> Result<String, ParlorError> {
    serde_json::to_string(message).map_err(ParlorError::cache)
}

fn decode_all(raw: Vec<String>) -> Result<Vec<Message>, ParlorError> {
    let mut messages = raw
        .iter()
        .map(|s| serde_json::from_str::<Message>(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ParlorError::cache)?;
    messages.sort_by_key(|m| m.id);
    Ok(messages)
}

/// Recency cache stored in Redis sorted sets.
pub struct RedisCache {
    conn: ConnectionManager,
    max_entries: usize,
    max_backfill: usize,
    ttl_secs: i64,
    write_script: Script,
    warm_script: Script,
    backfill_script: Script,
}

impl RedisCache {
    /// Connect to `url` with the sizing from `config`.
    pub async fn connect(url: &str, config: &CacheConfig) -> Result<Self, ParlorError> {
        let client = Client::open(url).map_err(ParlorError::cache)?;
        let manager_config = ConnectionManagerConfig::new().set_number_of_retries(2);
        let conn = client
            .get_connection_manager_with_config(manager_config)
            .await
            .map_err(ParlorError::cache)?;
        debug!(url, "redis cache connected");
        Ok(Self::with_connection(conn, config))
    }

    pub fn with_connection(conn: ConnectionManager, config: &CacheConfig) -> Self {
        Self {
            conn,
            max_entries: config.max_entries.max(1),
            max_backfill: config.max_backfill,
            ttl_secs: i64::try_from(config.ttl_secs).unwrap_or(i64::MAX),
            write_script: Script::new(WRITE_SCRIPT),
            warm_script: Script::new(WARM_SCRIPT),
            backfill_script: Script::new(BACKFILL_SCRIPT),
        }
    }
}

#[async_trait]
impl PluginAdapter for RedisCache {
    fn name(&self) -> &str {
        "redis-cache"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        let mut conn = self.conn.clone();
        let pong: Result<String, _> = ::redis::cmd("PING").query_async(&mut conn).await;
        Ok(match pong {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        Ok(())
    }
}

#[async_trait]
impl RecencyCache for RedisCache {
    async fn read(&self, room: &RoomId) -> Result<Vec<Message>, ParlorError> {
        let keys = RoomKeys::new(room);
        let mut conn = self.conn.clone();
        let (ready, raw): (bool, Vec<String>) = ::redis::pipe()
            .atomic()
            .exists(&keys.ready)
            .zrange(&keys.tail, 0, -1)
            .expire(&keys.tail, self.ttl_secs)
            .ignore()
            .expire(&keys.scratch, self.ttl_secs)
            .ignore()
            .expire(&keys.ready, self.ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(ParlorError::cache)?;
        if !ready {
            return Ok(Vec::new());
        }
        decode_all(raw)
    }

    async fn read_before(
        &self,
        room: &RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError> {
        let keys = RoomKeys::new(room);
        let mut conn = self.conn.clone();
        let exclusive = format!("({}", before.0);
        let count = isize::try_from(limit).unwrap_or(isize::MAX);
        let (ready, in_tail, in_scratch, tail, scratch): (
            bool,
            usize,
            usize,
            Vec<String>,
            Vec<String>,
        ) = ::redis::pipe()
            .atomic()
            .exists(&keys.ready)
            .zcount(&keys.tail, before.0, before.0)
            .zcount(&keys.scratch, before.0, before.0)
            .zrevrangebyscore_limit(&keys.tail, &exclusive, "-inf", 0, count)
            .zrevrangebyscore_limit(&keys.scratch, &exclusive, "-inf", 0, count)
            .expire(&keys.tail, self.ttl_secs)
            .ignore()
            .expire(&keys.scratch, self.ttl_secs)
            .ignore()
            .expire(&keys.ready, self.ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(ParlorError::cache)?;

        if !ready || in_tail + in_scratch == 0 {
            return Ok(Vec::new());
        }
        let mut messages = decode_all(tail.into_iter().chain(scratch).collect())?;
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }

    async fn write(&self, room: &RoomId, message: &Message) -> Result<(), ParlorError> {
        let keys = RoomKeys::new(room);
        let mut conn = self.conn.clone();
        let applied: i64 = self
            .write_script
            .key(&keys.tail)
            .key(&keys.scratch)
            .key(&keys.ready)
            .arg(message.id.0)
            .arg(encode(message)?)
            .arg(self.max_entries)
            .arg(self.max_backfill)
            .arg(self.ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(ParlorError::cache)?;
        if applied == 0 {
            debug!(room = %room, id = %message.id, "cache write skipped");
        }
        Ok(())
    }

    async fn warm(&self, room: &RoomId, messages: &[Message]) -> Result<(), ParlorError> {
        let keys = RoomKeys::new(room);
        let mut conn = self.conn.clone();
        let mut invocation = self.warm_script.prepare_invoke();
        invocation
            .key(&keys.tail)
            .key(&keys.scratch)
            .key(&keys.ready)
            .arg(self.max_entries)
            .arg(self.max_backfill)
            .arg(self.ttl_secs);
        for message in messages {
            invocation.arg(message.id.0).arg(encode(message)?);
        }
        let _: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(ParlorError::cache)?;
        Ok(())
    }

    async fn backfill(
        &self,
        room: &RoomId,
        before: MessageId,
        older: &[Message],
    ) -> Result<(), ParlorError> {
        if older.is_empty() || older.iter().any(|m| m.id >= before) {
            return Ok(());
        }
        let keys = RoomKeys::new(room);
        let mut conn = self.conn.clone();
        let mut invocation = self.backfill_script.prepare_invoke();
        invocation
            .key(&keys.tail)
            .key(&keys.scratch)
            .key(&keys.ready)
            .arg(before.0)
            .arg(self.max_backfill)
            .arg(self.ttl_secs);
        for message in older {
            invocation.arg(message.id.0).arg(encode(message)?);
        }
        let applied: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(ParlorError::cache)?;
        if applied == 0 {
            debug!(room = %room, before = %before, "backfill page not contiguous; dropped");
        }
        Ok(())
    }

    async fn invalidate(&self, room: &RoomId) -> Result<(), ParlorError> {
        let keys = RoomKeys::new(room);
        let mut conn = self.conn.clone();
        let removed: i64 = ::redis::cmd("DEL")
            .arg(&keys.ready)
            .arg(&keys.tail)
            .arg(&keys.scratch)
            .query_async(&mut conn)
            .await
            .map_err(ParlorError::cache)?;
        debug!(room = %room, removed, "cache entry invalidated");
        Ok(())
    }

    /// Redis expires keys on its own; this reclaims keys that lost their TTL.
    async fn sweep_expired(&self) -> Result<usize, ParlorError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{KEY_PREFIX}*");
        let mut cursor: u64 = 0;
        let mut removed = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
                .map_err(ParlorError::cache)?;
            for key in keys {
                let ttl: i64 = ::redis::cmd("TTL")
                    .arg(&key)
                    .query_async(&mut conn)
                    .await
                    .map_err(ParlorError::cache)?;
                if ttl == -1 {
                    warn!(key = %key, "cache key without expiry; removing");
                    let deleted: i64 = ::redis::cmd("DEL")
                        .arg(&key)
                        .query_async(&mut conn)
                        .await
                        .map_err(ParlorError::cache)?;
                    removed += usize::try_from(deleted).unwrap_or(0);
                }
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_keys_share_the_room_prefix() {
        let keys = RoomKeys::new(&RoomId::from("abc"));
        assert_eq!(keys.tail, "chat:abc");
        assert_eq!(keys.scratch, "chat:abc:older");
        assert_eq!(keys.ready, "chat:abc:ready");
    }

    #[test]
    fn decode_sorts_by_id() {
        let raw = vec![
            r#"{"id":3,"room_id":"r","sender_id":"u","body":"c","created_at":"t"}"#.to_string(),
            r#"{"id":1,"room_id":"r","sender_id":"u","body":"a","created_at":"t"}"#.to_string(),
        ];
        let decoded = decode_all(raw).unwrap();
        assert_eq!(decoded[0].id, MessageId(1));
        assert_eq!(decoded[1].id, MessageId(3));
    }

    #[test]
    fn corrupt_entry_is_a_cache_error() {
        let err = decode_all(vec!["not json".to_string()]).unwrap_err();
        assert_eq!(err.code(), "cache_unavailable");
    }
}
