// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis pub/sub bus for multi-process deployments.
//!
//! Events are published as JSON on `{prefix}{room}`. Each process holds a
//! single `PSUBSCRIBE {prefix}*` and hands every event to its local
//! [`RoomHub`], so a publisher's own subscribers hear the event exactly once,
//! through Redis, like everyone else's.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::{Client, Msg, RedisError};
use async_trait::async_trait;
use futures::StreamExt;
use parlor_core::{
    AdapterType, FanoutBus, HealthStatus, ParlorError, PluginAdapter, RoomEvent, RoomId,
};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::hub::RoomHub;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

fn bus_error(message: &str, err: RedisError) -> ParlorError {
    ParlorError::Bus {
        message: message.to_string(),
        source: Some(Box::new(err)),
    }
}

/// Channel carrying events for `room`.
pub fn channel_for(prefix: &str, room: &RoomId) -> String {
    format!("{prefix}{room}")
}

/// Decode an event received on the bus.
pub fn decode_event(payload: &str) -> Result<RoomEvent, ParlorError> {
    serde_json::from_str(payload).map_err(|e| ParlorError::Bus {
        message: "malformed room event".to_string(),
        source: Some(Box::new(e)),
    })
}

/// Fan-out bus backed by Redis pub/sub.
pub struct RedisBus {
    conn: ConnectionManager,
    prefix: String,
    hub: Arc<RoomHub>,
    subscribed: Arc<AtomicBool>,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl RedisBus {
    /// Connect the publisher and start the pattern listener.
    ///
    /// The listener runs until `cancel` fires or [`PluginAdapter::shutdown`]
    /// is called.
    pub async fn connect(
        url: &str,
        prefix: &str,
        hub: Arc<RoomHub>,
        cancel: CancellationToken,
    ) -> Result<Self, ParlorError> {
        let client = Client::open(url).map_err(|e| bus_error("invalid redis url", e))?;
        let manager_config = ConnectionManagerConfig::new().set_number_of_retries(2);
        let conn = client
            .get_connection_manager_with_config(manager_config)
            .await
            .map_err(|e| bus_error("redis connection failed", e))?;

        let cancel = cancel.child_token();
        let subscribed = Arc::new(AtomicBool::new(false));
        let listener = tokio::spawn(run_listener(
            client,
            format!("{prefix}*"),
            hub.clone(),
            subscribed.clone(),
            cancel.clone(),
        ));
        debug!(url, prefix, "redis bus connected");

        Ok(Self {
            conn,
            prefix: prefix.to_string(),
            hub,
            subscribed,
            cancel,
            listener: Mutex::new(Some(listener)),
        })
    }

    pub fn hub(&self) -> &Arc<RoomHub> {
        &self.hub
    }
}

async fn run_listener(
    client: Client,
    pattern: String,
    hub: Arc<RoomHub>,
    subscribed: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    loop {
        match listen(&client, &pattern, &hub, &subscribed, &cancel).await {
            Ok(()) => break,
            Err(e) => {
                subscribed.store(false, Ordering::Relaxed);
                warn!(error = %e, pattern, "bus listener lost its subscription, retrying");
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = cancel.cancelled() => break,
        }
    }
    subscribed.store(false, Ordering::Relaxed);
    debug!(pattern, "bus listener stopped");
}

/// Listen until cancelled (`Ok`) or the subscription breaks (`Err`).
async fn listen(
    client: &Client,
    pattern: &str,
    hub: &RoomHub,
    subscribed: &AtomicBool,
    cancel: &CancellationToken,
) -> Result<(), ParlorError> {
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .map_err(|e| bus_error("pubsub connection failed", e))?;
    pubsub
        .psubscribe(pattern)
        .await
        .map_err(|e| bus_error("psubscribe failed", e))?;
    subscribed.store(true, Ordering::Relaxed);
    info!(pattern, "bus listener subscribed");

    let mut stream = pubsub.on_message();
    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(msg) => dispatch(hub, &msg),
                None => {
                    return Err(ParlorError::Bus {
                        message: "subscription stream closed".to_string(),
                        source: None,
                    });
                }
            },
            _ = cancel.cancelled() => return Ok(()),
        }
    }
}

fn dispatch(hub: &RoomHub, msg: &Msg) {
    let payload: String = match msg.get_payload() {
        Ok(payload) => payload,
        Err(e) => {
            warn!(channel = msg.get_channel_name(), error = %e, "unreadable bus payload");
            return;
        }
    };
    match decode_event(&payload) {
        Ok(event) => {
            let reached = hub.deliver(&event);
            trace!(channel = msg.get_channel_name(), reached, "bus event dispatched");
        }
        Err(e) => warn!(channel = msg.get_channel_name(), error = %e, "dropping bus event"),
    }
}

#[async_trait]
impl PluginAdapter for RedisBus {
    fn name(&self) -> &str {
        "redis-bus"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bus
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        let mut conn = self.conn.clone();
        let pong: Result<String, _> = ::redis::cmd("PING").query_async(&mut conn).await;
        Ok(match pong {
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
            Ok(_) if !self.subscribed.load(Ordering::Relaxed) => {
                HealthStatus::Degraded("bus listener is not subscribed".to_string())
            }
            Ok(_) => HealthStatus::Healthy,
        })
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        self.cancel.cancel();
        if let Some(handle) = self.listener.lock().await.take() {
            handle
                .await
                .map_err(|e| ParlorError::Internal(format!("bus listener panicked: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl FanoutBus for RedisBus {
    async fn publish(&self, event: RoomEvent) -> Result<(), ParlorError> {
        let channel = channel_for(&self.prefix, &event.room_id);
        let payload = serde_json::to_string(&event)
            .map_err(|e| ParlorError::Internal(format!("encode room event: {e}")))?;
        let mut conn = self.conn.clone();
        let receivers: i64 = ::redis::cmd("PUBLISH")
            .arg(&channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| bus_error("publish failed", e))?;
        trace!(channel, receivers, "room event published");
        Ok(())
    }

    fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<RoomEvent> {
        self.hub.subscribe(room)
    }

    fn release(&self, room: &RoomId) {
        self.hub.release(room);
    }
}
