// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recency caches that fail on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parlor_core::{
    AdapterType, HealthStatus, Message, MessageId, ParlorError, PluginAdapter, RecencyCache,
    RoomId,
};

fn offline() -> ParlorError {
    ParlorError::cache(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "cache offline",
    ))
}

/// Every operation fails with [`ParlorError::CacheUnavailable`].
///
/// Counts calls so tests can check the cache was consulted before the store.
#[derive(Default)]
pub struct FailingCache {
    calls: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn fail<T>(&self) -> Result<T, ParlorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(offline())
    }
}

#[async_trait]
impl PluginAdapter for FailingCache {
    fn name(&self) -> &str {
        "failing-cache"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        Ok(HealthStatus::Unhealthy("cache offline".into()))
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        Ok(())
    }
}

#[async_trait]
impl RecencyCache for FailingCache {
    async fn read(&self, _room: &RoomId) -> Result<Vec<Message>, ParlorError> {
        self.fail()
    }

    async fn read_before(
        &self,
        _room: &RoomId,
        _before: MessageId,
        _limit: usize,
    ) -> Result<Vec<Message>, ParlorError> {
        self.fail()
    }

    async fn write(&self, _room: &RoomId, _message: &Message) -> Result<(), ParlorError> {
        self.fail()
    }

    async fn warm(&self, _room: &RoomId, _messages: &[Message]) -> Result<(), ParlorError> {
        self.fail()
    }

    async fn backfill(
        &self,
        _room: &RoomId,
        _before: MessageId,
        _older: &[Message],
    ) -> Result<(), ParlorError> {
        self.fail()
    }

    async fn invalidate(&self, _room: &RoomId) -> Result<(), ParlorError> {
        self.fail()
    }

    async fn sweep_expired(&self) -> Result<usize, ParlorError> {
        self.fail()
    }
}

/// Wraps a working cache and fails the next N writes on request.
pub struct FlakyCache {
    inner: Arc<dyn RecencyCache>,
    failing_writes: AtomicUsize,
}

impl FlakyCache {
    pub fn new(inner: Arc<dyn RecencyCache>) -> Self {
        Self {
            inner,
            failing_writes: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` writes fail without reaching the inner cache.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for FlakyCache {
    fn name(&self) -> &str {
        "flaky-cache"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl RecencyCache for FlakyCache {
    async fn read(&self, room: &RoomId) -> Result<Vec<Message>, ParlorError> {
        self.inner.read(room).await
    }

    async fn read_before(
        &self,
        room: &RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError> {
        self.inner.read_before(room, before, limit).await
    }

    async fn write(&self, room: &RoomId, message: &Message) -> Result<(), ParlorError> {
        let failed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(offline());
        }
        self.inner.write(room, message).await
    }

    async fn warm(&self, room: &RoomId, messages: &[Message]) -> Result<(), ParlorError> {
        self.inner.warm(room, messages).await
    }

    async fn backfill(
        &self,
        room: &RoomId,
        before: MessageId,
        older: &[Message],
    ) -> Result<(), ParlorError> {
        self.inner.backfill(room, before, older).await
    }

    async fn invalidate(&self, room: &RoomId) -> Result<(), ParlorError> {
        self.inner.invalidate(room).await
    }

    async fn sweep_expired(&self) -> Result<usize, ParlorError> {
        self.inner.sweep_expired().await
    }
}
