// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the pluggable backends.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod auth;
pub mod bus;
pub mod cache;
pub mod store;

pub use adapter::PluginAdapter;
pub use auth::SessionResolver;
pub use bus::FanoutBus;
pub use cache::RecencyCache;
pub use store::RoomStore;
