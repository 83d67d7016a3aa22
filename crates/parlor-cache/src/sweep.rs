// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic expiry sweep.
//!
//! Correctness never depends on the sweep: expired rooms already read as
//! cold. The sweep only reclaims memory held by rooms nobody touches again.

use std::sync::Arc;
use std::time::Duration;

use parlor_core::RecencyCache;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawn a task that calls [`RecencyCache::sweep_expired`] every `interval`
/// until `cancel` fires.
pub fn spawn_sweeper(
    cache: Arc<dyn RecencyCache>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match cache.sweep_expired().await {
                        Ok(0) => debug!("cache sweep found nothing to reclaim"),
                        Ok(removed) => info!(removed, "cache sweep reclaimed rooms"),
                        Err(e) => warn!(error = %e, "cache sweep failed (non-fatal)"),
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("cache sweeper shutting down");
                    break;
                }
            }
        }
    })
}
