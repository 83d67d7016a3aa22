// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parlor integration tests.
//!
//! Provides mock adapters and a harness assembling the room stack in-process
//! (temp SQLite store, memory cache, local bus) without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - Room service over real adapters plus seeding helpers
//! - [`FailingCache`] - Recency cache whose every call fails
//! - [`FlakyCache`] - Working cache whose writes can be made to fail
//! - [`RecordingBus`] - Local bus that remembers every published event

pub mod harness;
pub mod mock_bus;
pub mod mock_cache;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_bus::RecordingBus;
pub use mock_cache::{FailingCache, FlakyCache};
