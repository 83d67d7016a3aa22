// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlor serve` implementation.
//!
//! Wires the store, recency cache, fan-out bus, and room service together,
//! then runs the gateway until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use parlor_config::ParlorConfig;
use parlor_core::{ParlorError, PluginAdapter, RoomStore};
use parlor_gateway::{GateConfig, GatewayState, start_server};
use parlor_rooms::{PresenceRegistry, RoomPolicy, RoomService};
use parlor_storage::{Database, SqliteSessionResolver, SqliteStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::shutdown;

/// Runs the `parlor serve` command.
pub async fn run_serve(config: ParlorConfig) -> Result<(), ParlorError> {
    init_tracing(&config.server.log_level);

    let instance_id = config
        .server
        .instance_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(instance = %instance_id, "starting parlor serve");

    let cancel = shutdown::install_signal_handler();

    let db = Database::from_config(&config.storage).await?;
    let store = Arc::new(SqliteStore::new(db.clone()));
    let resolver = Arc::new(SqliteSessionResolver::new(db));
    info!(path = %config.storage.database_path, "storage initialized");

    if let Some(name) = &config.rooms.general_room {
        let room = store.ensure_shared_room(name).await?;
        info!(room = %room.id, name = %name, "general room ready");
    }

    let cache = parlor_cache::from_config(&config.cache).await?;
    info!(backend = ?config.cache.backend, "recency cache initialized");

    let bus = parlor_bus::from_config(&config.bus, cancel.child_token()).await?;
    info!(backend = ?config.bus.backend, "fan-out bus initialized");

    let sweeper = (config.cache.sweep_interval_secs > 0).then(|| {
        parlor_cache::spawn_sweeper(
            cache.clone(),
            Duration::from_secs(config.cache.sweep_interval_secs),
            cancel.child_token(),
        )
    });

    let service = Arc::new(RoomService::new(
        store.clone(),
        cache.clone(),
        bus.clone(),
        Arc::new(PresenceRegistry::new()),
        RoomPolicy::from(&config.rooms),
        instance_id,
    ));
    let state = GatewayState::new(
        service,
        resolver.clone(),
        GateConfig::new(&config.auth, &config.server),
    );

    let result = start_server(&config.server, state, cancel.clone()).await;

    // The server may also return on its own (bind failure); stop the rest.
    cancel.cancel();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "cache sweeper task failed");
        }
    }

    shutdown_adapter(bus.as_ref()).await;
    shutdown_adapter(cache.as_ref()).await;
    shutdown_adapter(resolver.as_ref()).await;
    shutdown_adapter(store.as_ref()).await;

    info!("parlor serve shutdown complete");
    result
}

async fn shutdown_adapter<A: PluginAdapter + ?Sized>(adapter: &A) {
    if let Err(e) = adapter.shutdown().await {
        warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn default_filter(log_level: &str) -> String {
    format!("parlor={log_level},tower_http={log_level},warn")
}
