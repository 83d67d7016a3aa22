// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session resolver for the externally established web session.

use async_trait::async_trait;

use crate::error::ParlorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Identity;

/// Resolves an opaque session token to the identity that owns it.
///
/// Sessions are created by the web application's login flow; this subsystem
/// only reads them. Unknown or expired tokens resolve to `None`.
#[async_trait]
pub trait SessionResolver: PluginAdapter {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, ParlorError>;
}
