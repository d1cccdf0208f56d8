// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Lifecycle, hook and configuration tests for the protocol server

mod common;

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::json;
use sqlhub_lsp::server::{ConfigChangeHook, InitializeHook, InitializedHook};
use sqlhub_lsp::{
    ProtocolServer, ServerContext, ServerError, ServerResult, ServerState, build_server,
};
use sqlhub_test_utils::{MockBehavior, SharedCalls};
use tower_lsp::lsp_types::{
    DidChangeConfigurationParams, HoverProviderCapability, InitializeParams, InitializeResult,
    InitializedParams, OneOf, ServerCapabilities, ServerInfo,
};

type Journal = Arc<Mutex<Vec<String>>>;

fn server() -> ProtocolServer {
    ProtocolServer::new(common::context(MockBehavior::default(), &SharedCalls::default(), false))
}

fn init_hook(journal: &Journal, tag: &'static str, capabilities: ServerCapabilities) -> InitializeHook {
    let journal = journal.clone();
    Arc::new(
        move |_ctx: Arc<ServerContext>,
              _params: InitializeParams|
              -> BoxFuture<'static, ServerResult<InitializeResult>> {
            journal.lock().unwrap().push(format!("initialize:{}", tag));
            let result = InitializeResult {
                capabilities: capabilities.clone(),
                server_info: Some(ServerInfo {
                    name: tag.to_string(),
                    version: None,
                }),
            };
            Box::pin(async move { Ok(result) })
        },
    )
}

fn initialized_hook(journal: &Journal, tag: &'static str) -> InitializedHook {
    let journal = journal.clone();
    Arc::new(
        move |_ctx: Arc<ServerContext>,
              _params: InitializedParams|
              -> BoxFuture<'static, ServerResult<()>> {
            journal.lock().unwrap().push(format!("initialized:{}", tag));
            Box::pin(async { Ok(()) })
        },
    )
}

fn config_hook(journal: &Journal, tag: &'static str) -> ConfigChangeHook {
    let journal = journal.clone();
    Arc::new(
        move |ctx: Arc<ServerContext>,
              params: DidChangeConfigurationParams|
              -> BoxFuture<'static, ServerResult<()>> {
            let journal = journal.clone();
            Box::pin(async move {
                let max_pages = ctx.config().await.max_pages;
                let sent = &params.settings["sqlhub"]["maxPages"];
                journal
                    .lock()
                    .unwrap()
                    .push(format!("config:{}:{}:{}", tag, max_pages, sent));
                Ok(())
            })
        },
    )
}

#[tokio::test]
async fn test_handshake_walks_the_state_machine() {
    let server = server();
    assert_eq!(server.state().await, ServerState::Uninitialized);

    server.initialize(InitializeParams::default()).await.unwrap();
    assert_eq!(server.state().await, ServerState::Initializing);

    server.initialized(InitializedParams {}).await.unwrap();
    assert_eq!(server.state().await, ServerState::Ready);
}

#[tokio::test]
async fn test_initialize_merges_hook_capabilities() {
    let journal = Journal::default();
    let mut server = server();
    server.on_initialize(init_hook(
        &journal,
        "first",
        ServerCapabilities {
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            document_formatting_provider: Some(OneOf::Left(false)),
            ..Default::default()
        },
    ));
    server.on_initialize(init_hook(
        &journal,
        "second",
        ServerCapabilities {
            definition_provider: Some(OneOf::Left(true)),
            ..Default::default()
        },
    ));

    let result = server.initialize(InitializeParams::default()).await.unwrap();
    let caps = serde_json::to_value(&result.capabilities).unwrap();

    assert_eq!(caps["textDocumentSync"], json!(2));
    assert_eq!(caps["documentRangeFormattingProvider"], json!(true));
    assert_eq!(caps["documentFormattingProvider"], json!(false));
    assert_eq!(caps["hoverProvider"], json!(true));
    assert_eq!(caps["definitionProvider"], json!(true));
    assert_eq!(result.server_info.unwrap().name, "second");
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["initialize:first", "initialize:second"]
    );
}

#[tokio::test]
async fn test_second_initialize_is_rejected() {
    let server = server();
    server.initialize(InitializeParams::default()).await.unwrap();

    let err = server.initialize(InitializeParams::default()).await.unwrap_err();
    assert!(err.is_invalid_action());

    server.initialized(InitializedParams {}).await.unwrap();
    let err = server.initialize(InitializeParams::default()).await.unwrap_err();
    assert!(err.is_invalid_action());
    assert_eq!(server.state().await, ServerState::Ready);
}

#[tokio::test]
async fn test_initialized_hooks_run_in_order_after_ready() {
    let journal = Journal::default();
    let mut server = server();
    server.on_initialized(initialized_hook(&journal, "a"));
    server.on_initialized(initialized_hook(&journal, "b"));

    server.initialized(InitializedParams {}).await.unwrap();
    assert!(journal.lock().unwrap().is_empty(), "initialized before initialize is ignored");

    server.initialize(InitializeParams::default()).await.unwrap();
    server.initialized(InitializedParams {}).await.unwrap();
    assert_eq!(*journal.lock().unwrap(), vec!["initialized:a", "initialized:b"]);
}

#[tokio::test]
async fn test_configuration_change_replaces_config_and_runs_hooks() {
    let journal = Journal::default();
    let mut server = server();
    server.on_config_change(config_hook(&journal, "a"));
    server.on_config_change(config_hook(&journal, "b"));
    server.initialize(InitializeParams::default()).await.unwrap();
    server.initialized(InitializedParams {}).await.unwrap();

    server
        .did_change_configuration(DidChangeConfigurationParams {
            settings: json!({
                "sqlhub": { "maxPages": 7, "plugins": ["builtin:pg"] },
                "telemetry": { "enableTelemetry": true }
            }),
        })
        .await
        .unwrap();

    let ctx = server.context();
    assert_eq!(ctx.config().await.max_pages, 7);
    assert!(ctx.telemetry_enabled());
    assert_eq!(*journal.lock().unwrap(), vec!["config:a:7:7", "config:b:7:7"]);

    // A later payload replaces everything, including keys it omits
    server
        .did_change_configuration(DidChangeConfigurationParams { settings: json!({}) })
        .await
        .unwrap();
    assert_eq!(ctx.config().await, sqlhub_lsp::ServerConfig::default());
    assert!(!ctx.telemetry_enabled());
    assert_eq!(server.state().await, ServerState::Ready);
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let journal = Journal::default();
    let mut server = server();
    server.on_config_change(config_hook(&journal, "a"));

    let err = server
        .did_change_configuration(DidChangeConfigurationParams {
            settings: json!({ "sqlhub": { "queryDeadlineSecs": 0 } }),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Config(_)));
    assert!(journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bootstrap_installs_every_plugin_by_default() {
    let server = build_server(common::context(
        MockBehavior::default(),
        &SharedCalls::default(),
        false,
    ))
    .unwrap();
    let result = server.initialize(InitializeParams::default()).await.unwrap();

    assert_eq!(result.server_info.unwrap().name, "sqlhub-ls");
    let aliases = server.context().driver_aliases().await;
    for alias in ["PostgreSQL", "RedshiftData", "mock", "pg", "redshift"] {
        assert!(aliases.contains(&alias.to_string()), "missing {}", alias);
    }
    let resources = server.context().resources(Some("RedshiftData")).await;
    assert_eq!(
        resources["extension-id"],
        json!("sqlhub.driver-redshift-data")
    );
}

#[tokio::test]
async fn test_bootstrap_honours_plugin_selection() {
    let server = build_server(common::context(
        MockBehavior::default(),
        &SharedCalls::default(),
        false,
    ))
    .unwrap();
    let params = InitializeParams {
        initialization_options: Some(json!({
            "telemetry": true,
            "userEnvVars": { "AWS_PROFILE": "dev" },
            "sqlhub": { "plugins": ["builtin:mock", "./missing-plugin"] }
        })),
        ..Default::default()
    };
    server.initialize(params).await.unwrap();

    assert_eq!(server.context().driver_aliases().await, vec!["mock"]);
    assert!(server.context().telemetry_enabled());
}

#[tokio::test]
async fn test_initialize_accepts_telemetry_options_object() {
    let server = server();
    let params = InitializeParams {
        initialization_options: Some(json!({
            "telemetry": { "enableTelemetry": true, "extraInfo": { "sessionId": "s-1" } }
        })),
        ..Default::default()
    };
    server.initialize(params).await.unwrap();
    assert!(server.context().telemetry_enabled());
}
