// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQLHub Language Server
//!
//! Long-lived server process that brokers editor requests to database
//! drivers loaded as plugins.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Client (VS Code, etc.)          │
//! └──────────────┬──────────────────────────┘
//!                │ LSP + custom requests
//!                ↓
//! ┌─────────────────────────────────────────┐
//! │        LspBackend (tower-lsp)           │
//! ├─────────────────────────────────────────┤
//! │  ProtocolServer: lifecycle + hooks      │
//! │  Router: ls/* and connection/*          │
//! └──────────────┬──────────────────────────┘
//!                │
//!         ┌──────┴──────┬────────────────┐
//!         ↓             ↓                ↓
//! ┌────────────┐ ┌──────────────┐ ┌─────────────┐
//! │  Registry  │ │  Connection  │ │   Plugin    │
//! │ + resources│ │   manager    │ │   catalog   │
//! └────────────┘ └──────────────┘ └─────────────┘
//! ```
//!
//! ## Configuration
//!
//! Settings arrive through `workspace/didChangeConfiguration` under the
//! `sqlhub` key and replace the working configuration wholesale:
//!
//! ```json
//! {
//!   "sqlhub": { "maxPages": 500, "queryDeadlineSecs": 120 },
//!   "telemetry": { "enableTelemetry": false }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`backend`]: tower-lsp binding
//! - [`server`]: lifecycle state machine and hooks
//! - [`router`]: custom request dispatch
//! - [`handlers`]: plugin and connection requests
//! - [`connection_manager`]: driver instances per connection
//! - [`plugins`]: bundled driver plugins

use std::sync::Arc;

pub mod backend;
pub mod config;
pub mod connection_manager;
pub mod context;
pub mod error;
pub mod handlers;
pub mod plugins;
pub mod router;
pub mod server;

// Re-exports for convenience
pub use backend::{LspBackend, ServerErrorNotification, build_service};
pub use config::{ConfigError, ServerConfig};
pub use connection_manager::{ConnectionManager, SharedDriver};
pub use context::ServerContext;
pub use error::{ServerError, ServerResult};
pub use plugins::PluginCatalog;
pub use router::{Handler, Router, describe_request, typed};
pub use server::{ClientNotifier, ProtocolServer, ServerErrorParams, ServerState};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name
pub const SERVER_NAME: &str = "sqlhub-ls";

/// Server with the plugin bootstrap hook and every custom request registered
pub fn build_server(ctx: Arc<ServerContext>) -> ServerResult<ProtocolServer> {
    let mut server = ProtocolServer::new(ctx);
    server.on_initialize(plugins::bootstrap_hook());
    handlers::register_all(&mut server)?;
    Ok(server)
}
