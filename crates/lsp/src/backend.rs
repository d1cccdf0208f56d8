// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # LSP Backend Implementation
//!
//! Binds the [`ProtocolServer`] to tower-lsp.
//!
//! ## Architecture
//!
//! ```text
//! Client → LspBackend (tower-lsp) → ProtocolServer → Router → handlers
//!                                         ↓
//!                                  ConnectionManager → drivers
//! ```
//!
//! Standard lifecycle messages go through the [`LanguageServer`] trait; the
//! driver requests (`ls/*`, `connection/*`) are registered as custom
//! methods that all forward into the router.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, ClientSocket, LanguageServer, LspService};
use tracing::{debug, error, info};

use crate::handlers::methods;
use crate::server::{ClientNotifier, ProtocolServer, ServerErrorParams};

/// `serverError` notification sent when a request handler fails
#[derive(Debug)]
pub enum ServerErrorNotification {}

impl Notification for ServerErrorNotification {
    type Params = ServerErrorParams;
    const METHOD: &'static str = "serverError";
}

#[async_trait]
impl ClientNotifier for Client {
    async fn server_error(&self, params: ServerErrorParams) {
        self.send_notification::<ServerErrorNotification>(params)
            .await;
    }
}

/// LSP backend implementation
pub struct LspBackend {
    /// LSP client for sending notifications
    client: Client,

    server: Arc<ProtocolServer>,
}

impl LspBackend {
    pub fn new(client: Client, server: Arc<ProtocolServer>) -> Self {
        Self { client, server }
    }

    pub fn server(&self) -> &Arc<ProtocolServer> {
        &self.server
    }

    async fn forward(&self, method: &str, params: Value) -> Result<Value> {
        self.server
            .handle_request(method, params, &self.client)
            .await
            .map_err(Into::into)
    }

    async fn register_plugin(&self, params: Value) -> Result<Value> {
        self.forward(methods::REGISTER_PLUGIN, params).await
    }

    async fn get_resources(&self, params: Value) -> Result<Value> {
        self.forward(methods::GET_RESOURCES, params).await
    }

    async fn connect(&self, params: Value) -> Result<Value> {
        self.forward(methods::CONNECT, params).await
    }

    async fn disconnect(&self, params: Value) -> Result<Value> {
        self.forward(methods::DISCONNECT, params).await
    }

    async fn test_connection(&self, params: Value) -> Result<Value> {
        self.forward(methods::TEST_CONNECTION, params).await
    }

    async fn query(&self, params: Value) -> Result<Value> {
        self.forward(methods::QUERY, params).await
    }

    async fn cancel_query(&self, params: Value) -> Result<Value> {
        self.forward(methods::CANCEL_QUERY, params).await
    }

    async fn get_children_for_item(&self, params: Value) -> Result<Value> {
        self.forward(methods::GET_CHILDREN_FOR_ITEM, params).await
    }

    async fn search(&self, params: Value) -> Result<Value> {
        self.forward(methods::SEARCH, params).await
    }

    async fn get_static_completions(&self, params: Value) -> Result<Value> {
        self.forward(methods::GET_STATIC_COMPLETIONS, params).await
    }
}

/// Build the tower-lsp service with every custom method wired in
pub fn build_service(server: Arc<ProtocolServer>) -> (LspService<LspBackend>, ClientSocket) {
    LspService::build(move |client| LspBackend::new(client, server))
        .custom_method(methods::REGISTER_PLUGIN, LspBackend::register_plugin)
        .custom_method(methods::GET_RESOURCES, LspBackend::get_resources)
        .custom_method(methods::CONNECT, LspBackend::connect)
        .custom_method(methods::DISCONNECT, LspBackend::disconnect)
        .custom_method(methods::TEST_CONNECTION, LspBackend::test_connection)
        .custom_method(methods::QUERY, LspBackend::query)
        .custom_method(methods::CANCEL_QUERY, LspBackend::cancel_query)
        .custom_method(methods::GET_CHILDREN_FOR_ITEM, LspBackend::get_children_for_item)
        .custom_method(methods::SEARCH, LspBackend::search)
        .custom_method(methods::GET_STATIC_COMPLETIONS, LspBackend::get_static_completions)
        .finish()
}

#[tower_lsp::async_trait]
impl LanguageServer for LspBackend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Client info: {:?}", params.client_info);
        self.server.initialize(params).await.map_err(Into::into)
    }

    async fn initialized(&self, params: InitializedParams) {
        if let Err(e) = self.server.initialized(params).await {
            error!("Initialized hook failed: {}", e);
            self.client
                .show_message(MessageType::ERROR, format!("SQLHub failed to start: {}", e))
                .await;
            return;
        }
        let aliases = self.server.context().driver_aliases().await;
        self.client
            .log_message(
                MessageType::INFO,
                format!("SQLHub language server ready, drivers: {}", aliases.join(", ")),
            )
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.server.shutdown().await;
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        if let Err(e) = self.server.did_change_configuration(params).await {
            error!("Failed to apply configuration: {}", e);
            self.client
                .server_error(ServerErrorParams {
                    message: "Failed to apply configuration".to_string(),
                    err_message: e.to_string(),
                })
                .await;
        }
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        debug!(uri = %params.text_document.uri, "Formatting is left to the client");
        Ok(None)
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        debug!(uri = %params.text_document.uri, "Formatting is left to the client");
        Ok(None)
    }
}
