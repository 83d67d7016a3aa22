// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlor sweep`: one pass of the cache expiry sweep.

use parlor_config::ParlorConfig;
use parlor_config::model::CacheBackend;
use parlor_core::ParlorError;

/// Reclaim every lapsed recency-cache entry once and report the count.
pub async fn run_sweep(config: ParlorConfig) -> Result<(), ParlorError> {
    if config.cache.backend == CacheBackend::Memory {
        println!("parlor: the memory cache lives inside `parlor serve`; nothing to sweep");
        return Ok(());
    }

    let cache = parlor_cache::from_config(&config.cache).await?;
    let removed = cache.sweep_expired().await?;
    println!("parlor: reclaimed {removed} expired room entries");
    Ok(())
}
