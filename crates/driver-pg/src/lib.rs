// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQLHub - PostgreSQL driver
//!
//! Socket-session driver built on `tokio-postgres`, registered under the
//! `PostgreSQL` and `pg` aliases by [`PgPlugin`].

pub mod credentials;
pub mod driver;
pub mod plugin;
pub mod queries;

// Re-exports
pub use credentials::PgCredentials;
pub use driver::PgDriver;
pub use plugin::{DRIVER_ALIASES, LOCATOR, PgPlugin};
pub use queries::PgQueries;
