// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-process bus.

use std::sync::Arc;

use async_trait::async_trait;
use parlor_core::{
    AdapterType, FanoutBus, HealthStatus, ParlorError, PluginAdapter, RoomEvent, RoomId,
};
use tokio::sync::broadcast;

use crate::hub::RoomHub;

/// Bus whose only subscribers live in this process.
pub struct LocalBus {
    hub: Arc<RoomHub>,
}

impl LocalBus {
    pub fn new(hub: Arc<RoomHub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Arc<RoomHub> {
        &self.hub
    }
}

#[async_trait]
impl PluginAdapter for LocalBus {
    fn name(&self) -> &str {
        "local-bus"
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
impl FanoutBus for LocalBus {
    async fn publish(&self, event: RoomEvent) -> Result<(), ParlorError> {
        self.hub.deliver(&event);
        Ok(())
    }

    fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<RoomEvent> {
        self.hub.subscribe(room)
    }

    fn release(&self, room: &RoomId) {
        self.hub.release(room);
    }
}
