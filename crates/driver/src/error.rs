// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for driver operations
//!
//! This module defines the error taxonomy shared by every driver and by the
//! server that hosts them.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors that can occur while talking to a backend through a driver
#[derive(Debug, Error, Clone, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum DriverError {
    /// Backend unreachable or the client could not be constructed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The backend rejected or failed a statement
    ///
    /// `position` is the 1-based character offset reported by the backend's
    /// scanner for syntax errors. `raw` keeps the backend's error payload.
    #[error("{message}")]
    Execution {
        message: String,
        position: Option<u32>,
        raw: Option<Value>,
    },

    /// No driver is registered under the requested alias
    #[error("No driver registered for alias '{0}'")]
    UnknownDriver(String),

    /// A protocol action that has no handler or is not allowed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A result page could not be fetched, or the page loop exceeded its bounds
    #[error("Pagination failed at page {page}: {reason}")]
    Pagination { page: usize, reason: String },

    /// Connection settings could not be turned into credentials
    #[error("Invalid driver configuration: {0}")]
    Configuration(String),

    /// A backend row did not have one value per column
    #[error("Row {row} has {found} values but {expected} columns were described")]
    RowArityMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The request was cancelled before the backend finished
    #[error("Request cancelled")]
    Cancelled,
}

impl DriverError {
    /// Build an execution error without position or raw payload
    pub fn execution(message: impl Into<String>) -> Self {
        DriverError::Execution {
            message: message.into(),
            position: None,
            raw: None,
        }
    }

    /// Scanner position carried by syntax errors, if any
    pub fn position(&self) -> Option<u32> {
        match self {
            DriverError::Execution { position, .. } => *position,
            _ => None,
        }
    }

    /// Raw payload reported to the client alongside an error envelope
    ///
    /// Execution errors forward the backend payload untouched; every other
    /// variant is serialized as-is.
    pub fn raw_payload(&self) -> Value {
        match self {
            DriverError::Execution { raw: Some(raw), .. } => raw.clone(),
            other => serde_json::to_value(other).unwrap_or(Value::Null),
        }
    }
}
