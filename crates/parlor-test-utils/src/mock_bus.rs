// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local bus that records what was published.

use std::sync::Arc;

use async_trait::async_trait;
use parlor_bus::{LocalBus, RoomHub};
use parlor_core::{
    AdapterType, FanoutBus, HealthStatus, ParlorError, PluginAdapter, RoomEvent,
    RoomEventPayload, RoomId,
};
use tokio::sync::{Mutex, broadcast};

/// Delivers like [`LocalBus`] and keeps a copy of every published event.
pub struct RecordingBus {
    inner: LocalBus,
    published: Mutex<Vec<RoomEvent>>,
}

impl RecordingBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: LocalBus::new(Arc::new(RoomHub::new(capacity))),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn hub(&self) -> &Arc<RoomHub> {
        self.inner.hub()
    }

    /// All events published so far.
    pub async fn published(&self) -> Vec<RoomEvent> {
        self.published.lock().await.clone()
    }

    /// Message events published so far, ignoring presence.
    pub async fn published_messages(&self) -> usize {
        self.published
            .lock()
            .await
            .iter()
            .filter(|e| matches!(e.payload, RoomEventPayload::Message { .. }))
            .count()
    }
}

#[async_trait]
impl PluginAdapter for RecordingBus {
    fn name(&self) -> &str {
        "recording-bus"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bus
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        Ok(())
    }
}

#[async_trait]
impl FanoutBus for RecordingBus {
    async fn publish(&self, event: RoomEvent) -> Result<(), ParlorError> {
        self.published.lock().await.push(event.clone());
        self.inner.publish(event).await
    }

    fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<RoomEvent> {
        self.inner.subscribe(room)
    }

    fn release(&self, room: &RoomId) {
        self.inner.release(room);
    }
}
