// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for rooms, messages, and the identity directory.

pub mod identities;
pub mod messages;
pub mod rooms;

/// Current time in the store's timestamp format (RFC 3339 UTC, milliseconds).
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
