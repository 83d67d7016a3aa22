// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis cache scripts against a live server.
//!
//! Skipped unless `PARLOR_TEST_REDIS_URL` is set.

use parlor_cache::RedisCache;
use parlor_config::model::{CacheBackend, CacheConfig};
use parlor_core::{Message, MessageId, RecencyCache, RoomId, UserId};

fn redis_url() -> Option<String> {
    std::env::var("PARLOR_TEST_REDIS_URL").ok()
}

async fn cache(url: &str, max_entries: usize) -> RedisCache {
    let config = CacheConfig {
        backend: CacheBackend::Redis,
        redis_url: Some(url.to_string()),
        max_entries,
        max_backfill: 200,
        ..CacheConfig::default()
    };
    RedisCache::connect(url, &config).await.unwrap()
}

fn fresh_room() -> RoomId {
    RoomId(format!("parlor-test-{}", uuid::Uuid::new_v4()))
}

fn msg(room: &RoomId, id: i64) -> Message {
    Message {
        id: MessageId(id),
        room_id: room.clone(),
        sender_id: UserId::from("u1"),
        sender_name: None,
        body: format!("m{id}"),
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

fn msgs(room: &RoomId, ids: std::ops::RangeInclusive<i64>) -> Vec<Message> {
    ids.map(|id| msg(room, id)).collect()
}

fn ids(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(|m| m.id.0).collect()
}

#[tokio::test]
async fn write_before_warm_is_held_until_warmed() {
    let Some(url) = redis_url() else {
        eprintln!("PARLOR_TEST_REDIS_URL not set, skipping");
        return;
    };
    let cache = cache(&url, 20).await;
    let room = fresh_room();

    cache.write(&room, &msg(&room, 4)).await.unwrap();
    assert!(cache.read(&room).await.unwrap().is_empty());

    cache.warm(&room, &msgs(&room, 1..=3)).await.unwrap();
    assert_eq!(ids(&cache.read(&room).await.unwrap()), vec![1, 2, 3, 4]);

    cache.invalidate(&room).await.unwrap();
}

#[tokio::test]
async fn tail_is_capped_and_evictions_stay_pageable() {
    let Some(url) = redis_url() else {
        eprintln!("PARLOR_TEST_REDIS_URL not set, skipping");
        return;
    };
    let cache = cache(&url, 20).await;
    let room = fresh_room();

    cache.warm(&room, &msgs(&room, 1..=20)).await.unwrap();
    for id in 21..=25 {
        cache.write(&room, &msg(&room, id)).await.unwrap();
    }
    assert_eq!(
        ids(&cache.read(&room).await.unwrap()),
        (6..=25).collect::<Vec<_>>()
    );

    // 6 is the oldest tail entry; everything older sits in scratch.
    assert_eq!(
        ids(&cache.read_before(&room, MessageId(6), 10).await.unwrap()),
        vec![1, 2, 3, 4, 5]
    );
    // A page that straddles scratch and tail.
    assert_eq!(
        ids(&cache.read_before(&room, MessageId(8), 5).await.unwrap()),
        vec![3, 4, 5, 6, 7]
    );
    // Cursor outside the cached span.
    assert!(cache.read_before(&room, MessageId(99), 5).await.unwrap().is_empty());

    cache.invalidate(&room).await.unwrap();
}

#[tokio::test]
async fn backfill_accepts_only_contiguous_pages() {
    let Some(url) = redis_url() else {
        eprintln!("PARLOR_TEST_REDIS_URL not set, skipping");
        return;
    };
    let cache = cache(&url, 3).await;
    let room = fresh_room();
    cache.warm(&room, &msgs(&room, 7..=9)).await.unwrap();

    cache.backfill(&room, MessageId(6), &msgs(&room, 4..=5)).await.unwrap();
    assert!(cache.read_before(&room, MessageId(7), 10).await.unwrap().is_empty());

    cache.backfill(&room, MessageId(7), &msgs(&room, 4..=6)).await.unwrap();
    assert_eq!(
        ids(&cache.read_before(&room, MessageId(7), 10).await.unwrap()),
        vec![4, 5, 6]
    );
    assert_eq!(ids(&cache.read(&room).await.unwrap()), vec![7, 8, 9]);

    cache.invalidate(&room).await.unwrap();
}

#[tokio::test]
async fn processes_share_one_tail_and_invalidation() {
    let Some(url) = redis_url() else {
        eprintln!("PARLOR_TEST_REDIS_URL not set, skipping");
        return;
    };
    let node_a = cache(&url, 20).await;
    let node_b = cache(&url, 20).await;
    let room = fresh_room();

    node_a.warm(&room, &msgs(&room, 1..=2)).await.unwrap();
    node_b.write(&room, &msg(&room, 3)).await.unwrap();
    assert_eq!(ids(&node_a.read(&room).await.unwrap()), vec![1, 2, 3]);

    node_b.invalidate(&room).await.unwrap();
    assert!(node_a.read(&room).await.unwrap().is_empty());

    // After invalidation a write is pending again until the next warm.
    node_a.write(&room, &msg(&room, 4)).await.unwrap();
    assert!(node_b.read(&room).await.unwrap().is_empty());
    node_b.warm(&room, &msgs(&room, 1..=3)).await.unwrap();
    assert_eq!(ids(&node_a.read(&room).await.unwrap()), vec![1, 2, 3, 4]);

    node_a.invalidate(&room).await.unwrap();
}
