// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQLHub - Redshift Data API driver
//!
//! Runs statements through the Amazon Redshift Data API, a submit/poll HTTP
//! service: each statement is submitted, polled until it settles and its
//! rows are fetched page by page.
//!
//! - [`RedshiftDataDriver`]: the [`sqlhub_driver::ConnectionDriver`] implementation
//! - [`HttpDataApiClient`]: JSON 1.1 client for the three Data API operations
//! - [`RedshiftDataPlugin`]: registers the driver under its aliases

pub mod client;
pub mod credentials;
pub mod driver;
pub mod plugin;
pub mod queries;

// Re-exports
pub use client::{DataApiConnector, HttpConnector, HttpDataApiClient};
pub use credentials::RedshiftDataCredentials;
pub use driver::RedshiftDataDriver;
pub use plugin::{DRIVER_ALIASES, LOCATOR, RedshiftDataPlugin};
pub use queries::RedshiftQueries;
