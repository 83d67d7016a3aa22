// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parlor chat subsystem.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parlor configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParlorConfig {
    /// HTTP/WebSocket listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Durable room and message store.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Recency cache sizing, horizon, and backend.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Cross-process fan-out bus.
    #[serde(default)]
    pub bus: BusConfig,

    /// Connection gate: where session tokens are read from.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Room policies.
    #[serde(default)]
    pub rooms: RoomsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Origins allowed to open cross-site connections. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Identifier of this process in the fleet. Generated at startup when unset.
    #[serde(default)]
    pub instance_id: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            allowed_origins: Vec::new(),
            instance_id: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parlor").join("parlor.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parlor.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Which implementation backs the recency cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Per-process map. Suitable for a single process.
    #[default]
    Memory,
    /// Shared Redis lists, one per room.
    Redis,
}

/// Recency cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Redis URL, required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Maximum messages in a room's live tail.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Sliding expiry horizon in seconds, refreshed on every read or write.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum messages kept in a room's pagination scratch region.
    #[serde(default = "default_max_backfill")]
    pub max_backfill: usize,

    /// Interval between background expiry sweeps. `0` disables the sweeper.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            max_backfill: default_max_backfill(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_max_entries() -> usize {
    20
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_backfill() -> usize {
    200
}

fn default_sweep_interval_secs() -> u64 {
    24 * 60 * 60
}

/// Which implementation carries room events between processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    /// In-process only. Correct for a single server process.
    #[default]
    Local,
    /// Redis pub/sub shared by every process.
    Redis,
}

/// Fan-out bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    #[serde(default)]
    pub backend: BusBackend,

    /// Redis URL, required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix for per-room pub/sub channels.
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,

    /// Per-room local broadcast buffer. Slow subscribers beyond this lag and skip.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: BusBackend::default(),
            redis_url: None,
            channel_prefix: default_channel_prefix(),
            capacity: default_bus_capacity(),
        }
    }
}

fn default_channel_prefix() -> String {
    "parlor:room:".to_string()
}

fn default_bus_capacity() -> usize {
    256
}

/// Connection gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Name of the web session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Accept `?token=` on the WebSocket URL for clients that cannot set cookies.
    #[serde(default)]
    pub allow_query_token: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            allow_query_token: false,
        }
    }
}

fn default_cookie_name() -> String {
    "parlor.sid".to_string()
}

/// Room policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoomsConfig {
    /// Page size for join history and `load_more`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Open shared room provisioned at startup. `None` skips provisioning.
    #[serde(default = "default_general_room")]
    pub general_room: Option<String>,

    /// Roles allowed to pair in a direct room. When non-empty, both members
    /// must hold a listed role and their roles must differ.
    #[serde(default)]
    pub direct_pair_roles: Vec<String>,

    /// Maximum accepted message body length in characters.
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            general_room: default_general_room(),
            direct_pair_roles: Vec::new(),
            max_body_chars: default_max_body_chars(),
        }
    }
}

fn default_history_limit() -> usize {
    20
}

fn default_general_room() -> Option<String> {
    Some("General Chat".to_string())
}

fn default_max_body_chars() -> usize {
    4000
}
