// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server errors
//!
//! [`ServerError`] wraps everything a request handler can fail with and maps
//! onto JSON-RPC errors at the transport boundary.

use serde_json::{Value, json};
use sqlhub_driver::DriverError;
use tower_lsp::jsonrpc;

use crate::config::ConfigError;

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// JSON-RPC code used for driver and action failures
pub const DRIVER_ERROR_CODE: i64 = -32001;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A driver or registry operation failed
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Settings could not be applied
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Request params or a result could not be (de)serialized
    #[error("Invalid params: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    /// An action without a handler, or one that is not allowed now
    pub fn invalid_action(message: impl Into<String>) -> Self {
        ServerError::Driver(DriverError::InvalidAction(message.into()))
    }

    pub fn is_invalid_action(&self) -> bool {
        matches!(self, ServerError::Driver(DriverError::InvalidAction(_)))
    }

    /// Structured payload sent along with the error
    pub fn payload(&self) -> Value {
        match self {
            ServerError::Driver(err) => serde_json::to_value(err).unwrap_or(Value::Null),
            ServerError::Config(err) => json!({ "kind": "configuration", "detail": err.to_string() }),
            ServerError::Json(err) => json!({ "kind": "invalidParams", "detail": err.to_string() }),
        }
    }
}

impl From<ServerError> for jsonrpc::Error {
    fn from(err: ServerError) -> Self {
        let code = match &err {
            ServerError::Json(_) => jsonrpc::ErrorCode::InvalidParams,
            ServerError::Driver(DriverError::InvalidAction(_)) => jsonrpc::ErrorCode::InvalidRequest,
            _ => jsonrpc::ErrorCode::ServerError(DRIVER_ERROR_CODE),
        };
        jsonrpc::Error {
            code,
            message: err.to_string().into(),
            data: Some(err.payload()),
        }
    }
}
