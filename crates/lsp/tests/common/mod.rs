// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Shared setup for server integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlhub_lsp::{
    ClientNotifier, PluginCatalog, ProtocolServer, ServerContext, ServerErrorParams, build_server,
};
use sqlhub_test_utils::{MockBehavior, MockPlugin, SharedCalls};
use tower_lsp::lsp_types::{InitializeParams, InitializedParams};

/// Collects `serverError` notifications
#[derive(Default)]
pub struct RecordingNotifier {
    pub errors: Mutex<Vec<ServerErrorParams>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

#[async_trait]
impl ClientNotifier for RecordingNotifier {
    async fn server_error(&self, params: ServerErrorParams) {
        self.errors.lock().unwrap().push(params);
    }
}

pub fn context(behavior: MockBehavior, calls: &SharedCalls, dev_mode: bool) -> Arc<ServerContext> {
    let catalog = PluginCatalog::builtin("/opt/sqlhub")
        .with_plugin(Arc::new(MockPlugin::new(behavior, calls.clone())));
    Arc::new(ServerContext::new(catalog, dev_mode))
}

/// A server past the handshake with every bundled plugin installed
pub async fn ready_server(behavior: MockBehavior, calls: &SharedCalls) -> Arc<ProtocolServer> {
    let server = build_server(context(behavior, calls, false)).unwrap();
    server.initialize(InitializeParams::default()).await.unwrap();
    server.initialized(InitializedParams {}).await.unwrap();
    Arc::new(server)
}

pub fn conn_info(name: &str) -> Value {
    json!({ "name": name, "driver": "mock" })
}
