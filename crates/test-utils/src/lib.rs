// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for sqlhub
//!
//! This crate provides common testing components including:
//! - A mock driver that records every call
//! - A scripted submit/poll statement API with round-trip counters
//! - Fixtures for connections, explorer nodes and SQL

pub mod fixtures;
pub mod mock_driver;
pub mod mock_plugin;
pub mod scripted_api;

// Re-exports for convenience
pub use fixtures::{Fixtures, keyword_rows, row};
pub use mock_driver::{DriverCalls, MockBehavior, MockDriver, MockDriverBuilder, SharedCalls};
pub use mock_plugin::{MOCK_ALIASES, MOCK_LOCATOR, MockPlugin};
pub use scripted_api::{ApiCounters, ScriptedStatementApi};
