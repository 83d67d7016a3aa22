// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Parlor chat subsystem.
//!
//! Serves the real-time channel on `GET /ws`, a small session-authenticated
//! REST surface under `/v1`, and a public `GET /health`. Every connection
//! passes the connection gate ([`auth`]) before any room logic runs.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod ws;

pub use auth::GateConfig;
pub use error::ApiError;
pub use server::{GatewayState, router, start_server};
