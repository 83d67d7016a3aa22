// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that every backend (store, cache, bus, session resolver) implements.

use async_trait::async_trait;

use crate::error::ParlorError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all Parlor backend adapters.
///
/// Provides identity, lifecycle, and health check capabilities so the
/// gateway can report on every injected dependency uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    /// Returns the role this adapter plays.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, ParlorError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), ParlorError>;
}
