// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Protocol server
//!
//! Lifecycle shell around the request router.
//!
//! ## State machine
//!
//! ```text
//! Uninitialized --initialize--> Initializing --initialized--> Ready
//! ```
//!
//! While initializing, the initialize hooks run in registration order and
//! each contributes capabilities that are merged key-wise over the base set.
//! Configuration changes are accepted at any time and never change state.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tower_lsp::lsp_types::{
    DidChangeConfigurationParams, InitializeParams, InitializeResult, InitializedParams,
    OneOf, ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind,
};
use tracing::{debug, error, info, warn};

use crate::config::{NAMESPACE, ServerConfig, telemetry_enabled, telemetry_option};
use crate::context::ServerContext;
use crate::error::{ServerError, ServerResult};
use crate::router::{Handler, Router};

/// Lifecycle state of the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Uninitialized,
    Initializing,
    Ready,
}

pub type InitializeHook = Arc<
    dyn Fn(Arc<ServerContext>, InitializeParams) -> BoxFuture<'static, ServerResult<InitializeResult>>
        + Send
        + Sync,
>;

pub type InitializedHook = Arc<
    dyn Fn(Arc<ServerContext>, InitializedParams) -> BoxFuture<'static, ServerResult<()>>
        + Send
        + Sync,
>;

pub type ConfigChangeHook = Arc<
    dyn Fn(Arc<ServerContext>, DidChangeConfigurationParams) -> BoxFuture<'static, ServerResult<()>>
        + Send
        + Sync,
>;

/// Payload of the `serverError` notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorParams {
    pub message: String,
    pub err_message: String,
}

/// Outbound notifications the server sends on its own
#[async_trait]
pub trait ClientNotifier: Send + Sync {
    async fn server_error(&self, params: ServerErrorParams);
}

pub struct ProtocolServer {
    ctx: Arc<ServerContext>,
    state: RwLock<ServerState>,
    router: Router,
    initialize_hooks: Vec<InitializeHook>,
    initialized_hooks: Vec<InitializedHook>,
    config_hooks: Vec<ConfigChangeHook>,
}

impl ProtocolServer {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self {
            ctx,
            state: RwLock::new(ServerState::Uninitialized),
            router: Router::new(),
            initialize_hooks: Vec::new(),
            initialized_hooks: Vec::new(),
            config_hooks: Vec::new(),
        }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    pub fn on_initialize(&mut self, hook: InitializeHook) {
        self.initialize_hooks.push(hook);
    }

    pub fn on_initialized(&mut self, hook: InitializedHook) {
        self.initialized_hooks.push(hook);
    }

    pub fn on_config_change(&mut self, hook: ConfigChangeHook) {
        self.config_hooks.push(hook);
    }

    pub fn on_request(&mut self, method: impl Into<String>, handler: Handler) -> ServerResult<()> {
        self.router.on_request(method, handler)
    }

    /// Handle the `initialize` request
    pub async fn initialize(&self, params: InitializeParams) -> ServerResult<InitializeResult> {
        {
            let mut state = self.state.write().await;
            if *state != ServerState::Uninitialized {
                return Err(ServerError::invalid_action(format!(
                    "Cannot initialize a server that is {:?}",
                    *state
                )));
            }
            *state = ServerState::Initializing;
        }
        info!(client = ?params.client_info.as_ref().map(|c| &c.name), "Initializing server");

        match self.run_initialize_hooks(params).await {
            Ok(result) => Ok(result),
            Err(e) => {
                *self.state.write().await = ServerState::Uninitialized;
                Err(e)
            }
        }
    }

    async fn run_initialize_hooks(&self, params: InitializeParams) -> ServerResult<InitializeResult> {
        if let Some(options) = &params.initialization_options {
            if let Some(env) = options.get("userEnvVars") {
                debug!("User env vars: {}", env);
            }
            if let Some(enabled) = options.get("telemetry").and_then(telemetry_option) {
                self.ctx.set_telemetry(enabled);
            }
            if options.get(NAMESPACE).is_some() {
                self.ctx.set_config(ServerConfig::from_lsp_settings(options)?).await;
            }
        }

        let mut capabilities = capabilities_map(&base_capabilities())?;
        let mut server_info = None;
        for hook in &self.initialize_hooks {
            let result = hook(self.ctx.clone(), params.clone()).await?;
            capabilities.extend(capabilities_map(&result.capabilities)?);
            if result.server_info.is_some() {
                server_info = result.server_info;
            }
        }

        Ok(InitializeResult {
            capabilities: serde_json::from_value(Value::Object(capabilities))?,
            server_info: server_info.or_else(|| {
                Some(ServerInfo {
                    name: crate::SERVER_NAME.to_string(),
                    version: Some(crate::VERSION.to_string()),
                })
            }),
        })
    }

    /// Handle the `initialized` notification
    pub async fn initialized(&self, params: InitializedParams) -> ServerResult<()> {
        {
            let mut state = self.state.write().await;
            match *state {
                ServerState::Initializing => *state = ServerState::Ready,
                other => {
                    warn!(state = ?other, "Ignoring initialized notification");
                    return Ok(());
                }
            }
        }
        info!("Server ready");
        for hook in &self.initialized_hooks {
            hook(self.ctx.clone(), params.clone()).await?;
        }
        Ok(())
    }

    /// Replace the working configuration and run the config-change hooks
    pub async fn did_change_configuration(
        &self,
        params: DidChangeConfigurationParams,
    ) -> ServerResult<()> {
        let config = ServerConfig::from_lsp_settings(&params.settings)?;
        self.ctx.set_config(config).await;
        self.ctx.set_telemetry(telemetry_enabled(&params.settings));
        for hook in &self.config_hooks {
            hook(self.ctx.clone(), params.clone()).await?;
        }
        Ok(())
    }

    /// Dispatch a custom request, telling the client when it fails
    pub async fn handle_request(
        &self,
        method: &str,
        params: Value,
        notifier: &dyn ClientNotifier,
    ) -> ServerResult<Value> {
        let result = self.router.dispatch(self.ctx.clone(), method, params).await;
        if let Err(e) = &result {
            error!(method = %method, "Request failed: {}", e);
            notifier
                .server_error(ServerErrorParams {
                    message: format!("Request '{}' failed", method),
                    err_message: e.to_string(),
                })
                .await;
        }
        result
    }

    /// Close every connection
    pub async fn shutdown(&self) {
        info!("Shutting down, closing connections");
        self.ctx.connections().close_all().await;
    }
}

impl std::fmt::Debug for ProtocolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolServer")
            .field("router", &self.router)
            .field("initialize_hooks", &self.initialize_hooks.len())
            .field("initialized_hooks", &self.initialized_hooks.len())
            .field("config_hooks", &self.config_hooks.len())
            .finish()
    }
}

/// Capabilities advertised before any hook runs
pub fn base_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(
            TextDocumentSyncKind::INCREMENTAL,
        )),
        document_formatting_provider: Some(OneOf::Left(true)),
        document_range_formatting_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

fn capabilities_map(capabilities: &ServerCapabilities) -> ServerResult<Map<String, Value>> {
    match serde_json::to_value(capabilities)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_capabilities_wire_shape() {
        let map = capabilities_map(&base_capabilities()).unwrap();
        assert_eq!(map["textDocumentSync"], json!(2));
        assert_eq!(map["documentFormattingProvider"], json!(true));
        assert_eq!(map["documentRangeFormattingProvider"], json!(true));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_default_capabilities_contribute_nothing() {
        assert!(capabilities_map(&ServerCapabilities::default()).unwrap().is_empty());
    }
}
