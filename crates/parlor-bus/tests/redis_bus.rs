// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two buses on one Redis server behave like two processes.
//!
//! Skipped unless `PARLOR_TEST_REDIS_URL` is set.

use std::sync::Arc;
use std::time::Duration;

use parlor_bus::{RedisBus, RoomHub};
use parlor_core::{FanoutBus, HealthStatus, PluginAdapter, PresenceStatus, RoomEvent, RoomId, UserId};
use tokio_util::sync::CancellationToken;

fn redis_url() -> Option<String> {
    std::env::var("PARLOR_TEST_REDIS_URL").ok()
}

async fn wait_subscribed(bus: &RedisBus) {
    for _ in 0..50 {
        if bus.health_check().await.unwrap() == HealthStatus::Healthy {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("bus listener never subscribed");
}

#[tokio::test]
async fn event_crosses_processes_exactly_once() {
    let Some(url) = redis_url() else {
        eprintln!("PARLOR_TEST_REDIS_URL not set, skipping");
        return;
    };
    let prefix = format!("parlor-test:{}:", uuid::Uuid::new_v4());
    let cancel = CancellationToken::new();
    let node_a = RedisBus::connect(&url, &prefix, Arc::new(RoomHub::new(16)), cancel.clone())
        .await
        .unwrap();
    let node_b = RedisBus::connect(&url, &prefix, Arc::new(RoomHub::new(16)), cancel.clone())
        .await
        .unwrap();
    wait_subscribed(&node_a).await;
    wait_subscribed(&node_b).await;

    let room = RoomId::from("r1");
    let mut on_a = node_a.subscribe(&room);
    let mut on_b = node_b.subscribe(&room);

    let event = RoomEvent::presence("node-a", room.clone(), UserId::from("u1"), PresenceStatus::Online);
    node_a.publish(event.clone()).await.unwrap();

    for rx in [&mut on_a, &mut on_b] {
        let got = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event delivered")
            .unwrap();
        assert_eq!(got, event);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(on_a.try_recv().is_err());
    assert!(on_b.try_recv().is_err());

    node_a.shutdown().await.unwrap();
    node_b.shutdown().await.unwrap();
}
