// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parlor chat subsystem.
//!
//! This crate provides the error taxonomy, domain types, and adapter traits
//! shared by the store, cache, bus, room protocol, and gateway crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ParlorError;
pub use types::{
    AdapterType, HealthStatus, Identity, Message, MessageId, NewRoom, PresenceStatus, Room,
    RoomEvent, RoomEventPayload, RoomId, RoomKind, RoomSummary, UserId,
};

pub use traits::{FanoutBus, PluginAdapter, RecencyCache, RoomStore, SessionResolver};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Store,
            AdapterType::Cache,
            AdapterType::Bus,
            AdapterType::Auth,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_room_store<T: RoomStore>() {}
        fn _assert_recency_cache<T: RecencyCache>() {}
        fn _assert_fanout_bus<T: FanoutBus>() {}
        fn _assert_session_resolver<T: SessionResolver>() {}
    }
}
