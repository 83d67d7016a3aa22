// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parlor chat subsystem.

use thiserror::Error;

/// The primary error type used across all Parlor adapter traits and room operations.
#[derive(Debug, Error)]
pub enum ParlorError {
    /// No valid web session was presented at connect time.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Valid identity, but not allowed to act on the requested room.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Room, message cursor, or referenced identity is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request payload rejected before any state change (e.g. empty body).
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Durable store failure (connection, query, migration).
    #[error("store unavailable: {source}")]
    StoreUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Recency cache failure. Never surfaced to clients; callers degrade to the store.
    #[error("cache unavailable: {source}")]
    CacheUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Fan-out bus failure (publish or subscription listener).
    #[error("bus error: {message}")]
    Bus {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level errors in the HTTP/WebSocket gateway.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParlorError {
    /// Wraps any backend error as a store failure.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ParlorError::StoreUnavailable {
            source: Box::new(err),
        }
    }

    /// Wraps any backend error as a cache failure.
    pub fn cache(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ParlorError::CacheUnavailable {
            source: Box::new(err),
        }
    }

    /// Stable machine-readable code sent to clients in `{error: {code, message}}`.
    pub fn code(&self) -> &'static str {
        match self {
            ParlorError::AuthenticationRequired => "authentication_required",
            ParlorError::NotAuthorized(_) => "not_authorized",
            ParlorError::NotFound(_) => "not_found",
            ParlorError::ValidationFailed(_) => "validation_failed",
            ParlorError::Conflict(_) => "conflict",
            ParlorError::StoreUnavailable { .. } => "store_unavailable",
            ParlorError::CacheUnavailable { .. } => "cache_unavailable",
            ParlorError::Bus { .. } => "bus_unavailable",
            ParlorError::Config(_) => "config",
            ParlorError::Gateway { .. } => "gateway",
            ParlorError::Internal(_) => "internal",
        }
    }

    /// Whether the connection may keep going after this error.
    ///
    /// Only authentication failures end a connection attempt; everything else
    /// is reported on the request that caused it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ParlorError::AuthenticationRequired)
    }

    /// Message safe to show to clients. Backend details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            ParlorError::StoreUnavailable { .. } => "message store unavailable".to_string(),
            ParlorError::CacheUnavailable { .. } => "message cache unavailable".to_string(),
            ParlorError::Bus { .. } => "message bus unavailable".to_string(),
            ParlorError::Internal(_) | ParlorError::Gateway { .. } | ParlorError::Config(_) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}
