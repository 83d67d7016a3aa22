// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room session protocol for the Parlor chat subsystem.
//!
//! - [`protocol`]: JSON frames exchanged on the real-time channel.
//! - [`presence`]: process-local map from identity to connected endpoints.
//! - [`service`]: room operations over the injected store, cache, and bus.
//! - [`session`]: per-connection state machine driving the service.

pub mod presence;
pub mod protocol;
pub mod service;
pub mod session;

pub use presence::{ConnectionId, Endpoint, PresenceRegistry};
pub use protocol::{ClientFrame, ErrorBody, ServerFrame};
pub use service::{RoomPolicy, RoomService};
pub use session::{ConnectionSession, RoomState};
