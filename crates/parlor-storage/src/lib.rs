// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Parlor chat subsystem.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for rooms,
//! memberships, messages, and the web-session directory.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! The [`Database`] handle IS the single writer; clones share that thread.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::{SqliteSessionResolver, SqliteStore};
pub use database::Database;
