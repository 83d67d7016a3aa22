// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-process fan-out of room events.
//!
//! Every process keeps a [`RoomHub`]: one broadcast channel per room with at
//! least one local subscriber. A [`FanoutBus`](parlor_core::FanoutBus)
//! backend carries published events into the hub of every process:
//! - [`LocalBus`] delivers straight into this process's hub;
//! - [`RedisBus`] publishes on a per-room Redis channel and runs one pattern
//!   subscription per process that feeds the local hub.

pub mod hub;
pub mod local;
pub mod redis;

use std::sync::Arc;

use parlor_config::model::{BusBackend, BusConfig};
use parlor_core::{FanoutBus, ParlorError};
use tokio_util::sync::CancellationToken;

pub use hub::RoomHub;
pub use local::LocalBus;
pub use self::redis::RedisBus;

/// Build the bus backend selected by `config.backend`.
///
/// The Redis listener stops when `cancel` fires.
pub async fn from_config(
    config: &BusConfig,
    cancel: CancellationToken,
) -> Result<Arc<dyn FanoutBus>, ParlorError> {
    let hub = Arc::new(RoomHub::new(config.capacity));
    match config.backend {
        BusBackend::Local => Ok(Arc::new(LocalBus::new(hub))),
        BusBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                ParlorError::Config("bus.redis_url is required for the redis backend".into())
            })?;
            Ok(Arc::new(
                RedisBus::connect(url, &config.channel_prefix, hub, cancel).await?,
            ))
        }
    }
}
