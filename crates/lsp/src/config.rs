// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server configuration
//!
//! The working configuration is replaced wholesale from the client's
//! settings on every configuration change.
//!
//! ## Example
//!
//! ```json
//! {
//!   "sqlhub": {
//!     "maxPages": 500,
//!     "queryDeadlineSecs": 120,
//!     "pollIntervalMs": 200,
//!     "plugins": ["builtin:pg"]
//!   },
//!   "telemetry": { "enableTelemetry": false }
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlhub_driver::PaginationLimits;
use sqlhub_driver::pagination::{DEFAULT_DEADLINE_SECS, DEFAULT_MAX_PAGES, DEFAULT_POLL_INTERVAL_MS};

/// Settings key holding the server's section
pub const NAMESPACE: &str = "sqlhub";

/// Working configuration of the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Maximum result pages fetched per statement
    pub max_pages: usize,

    /// Time budget for one statement, in seconds
    pub query_deadline_secs: u64,

    /// Delay between status polls, in milliseconds
    pub poll_interval_ms: u64,

    /// Plugin locators installed at initialize; all built-ins when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,

    /// Everything else in the section, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            query_deadline_secs: DEFAULT_DEADLINE_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            plugins: None,
            extra: Map::new(),
        }
    }
}

impl ServerConfig {
    /// Parse the server section of a settings payload
    ///
    /// A missing or null section yields the defaults.
    pub fn from_lsp_settings(settings: &Value) -> Result<Self, ConfigError> {
        let section = match settings.get(NAMESPACE) {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(section) => section.clone(),
        };
        let config: Self =
            serde_json::from_value(section).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidPagination {
                reason: "maxPages must be > 0".to_string(),
            });
        }
        if self.query_deadline_secs == 0 {
            return Err(ConfigError::InvalidPagination {
                reason: "queryDeadlineSecs must be > 0".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPagination {
                reason: "pollIntervalMs must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Bounds applied to every statement
    pub fn pagination_limits(&self) -> PaginationLimits {
        PaginationLimits {
            max_pages: self.max_pages,
            deadline: Duration::from_secs(self.query_deadline_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// `settings.telemetry.enableTelemetry`, false when absent
pub fn telemetry_enabled(settings: &Value) -> bool {
    settings
        .get("telemetry")
        .and_then(telemetry_option)
        .unwrap_or(false)
}

/// Telemetry flag from a bare bool or a `{ enableTelemetry }` object
pub fn telemetry_option(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(enabled) => Some(*enabled),
        Value::Object(opts) => opts.get("enableTelemetry").and_then(Value::as_bool),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The section does not have the expected shape
    #[error("Invalid settings: {0}")]
    Invalid(String),

    /// Pagination bounds that would never let a statement finish
    #[error("Invalid pagination settings: {reason}")]
    InvalidPagination { reason: String },
}
