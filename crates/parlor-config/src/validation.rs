// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as bind addresses, positive cache bounds, and backend URLs.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{BusBackend, CacheBackend, ParlorConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParlorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        fail(format!(
            "server.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.server.log_level
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.cache.max_entries == 0 {
        fail("cache.max_entries must be at least 1".to_string());
    }
    if config.cache.ttl_secs == 0 {
        fail("cache.ttl_secs must be greater than 0".to_string());
    }
    if config.cache.backend == CacheBackend::Redis && config.cache.redis_url.is_none() {
        fail("cache.redis_url is required when cache.backend = \"redis\"".to_string());
    }

    if config.bus.backend == BusBackend::Redis && config.bus.redis_url.is_none() {
        fail("bus.redis_url is required when bus.backend = \"redis\"".to_string());
    }
    // A per-process cache never sees messages sent through other processes.
    if config.bus.backend == BusBackend::Redis && config.cache.backend == CacheBackend::Memory {
        fail(
            "bus.backend = \"redis\" needs cache.backend = \"redis\"; a memory cache is per-process"
                .to_string(),
        );
    }
    if config.bus.capacity == 0 {
        fail("bus.capacity must be at least 1".to_string());
    }
    if config.bus.channel_prefix.contains(['*', '?', '[']) {
        fail(format!(
            "bus.channel_prefix `{}` must not contain pattern characters",
            config.bus.channel_prefix
        ));
    }

    if config.auth.cookie_name.trim().is_empty() {
        fail("auth.cookie_name must not be empty".to_string());
    }

    if config.rooms.history_limit == 0 {
        fail("rooms.history_limit must be at least 1".to_string());
    }
    if config.rooms.max_body_chars == 0 {
        fail("rooms.max_body_chars must be at least 1".to_string());
    }
    if matches!(&config.rooms.general_room, Some(name) if name.trim().is_empty()) {
        fail("rooms.general_room must not be blank; omit it to skip provisioning".to_string());
    }

    let roles = &config.rooms.direct_pair_roles;
    if !roles.is_empty() {
        let distinct: HashSet<&str> = roles.iter().map(String::as_str).collect();
        if distinct.len() < 2 {
            fail(
                "rooms.direct_pair_roles needs at least two distinct roles, or none".to_string(),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
