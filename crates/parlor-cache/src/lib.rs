// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recency cache backends for the Parlor chat subsystem.
//!
//! Two implementations of [`RecencyCache`](parlor_core::RecencyCache):
//! - [`MemoryCache`]: per-process map, correct for a single server process;
//! - [`RedisCache`]: sorted sets per room, shared by every process.
//!
//! [`spawn_sweeper`] runs the periodic expiry sweep.

pub mod memory;
pub mod redis;
pub mod sweep;

use std::sync::Arc;

use parlor_config::model::{CacheBackend, CacheConfig};
use parlor_core::{ParlorError, RecencyCache};

pub use memory::MemoryCache;
pub use self::redis::RedisCache;
pub use sweep::spawn_sweeper;

/// Build the cache backend selected by `config.backend`.
pub async fn from_config(config: &CacheConfig) -> Result<Arc<dyn RecencyCache>, ParlorError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::from_config(config))),
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                ParlorError::Config("cache.redis_url is required for the redis backend".into())
            })?;
            Ok(Arc::new(RedisCache::connect(url, config).await?))
        }
    }
}
