// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sqlhub_lsp::{PluginCatalog, ServerContext, build_server, build_service};
use tower_lsp::Server;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `development` turns on request argument logging
const ENV_VAR: &str = "SQLHUB_ENV";

/// Overrides where plugin resources (icons) live
const RESOURCES_VAR: &str = "SQLHUB_RESOURCES";

fn resources_root() -> anyhow::Result<PathBuf> {
    if let Ok(root) = std::env::var(RESOURCES_VAR) {
        return Ok(PathBuf::from(root));
    }
    let exe = std::env::current_exe().context("Failed to locate server executable")?;
    Ok(exe
        .parent()
        .map(|dir| dir.join("resources"))
        .unwrap_or_else(|| PathBuf::from("resources")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let dev_mode = std::env::var(ENV_VAR).is_ok_and(|v| v == "development");
    let resources = resources_root()?;
    tracing::info!(
        version = sqlhub_lsp::VERSION,
        dev_mode,
        resources = %resources.display(),
        "Starting SQLHub language server"
    );

    let ctx = Arc::new(ServerContext::new(PluginCatalog::builtin(resources), dev_mode));
    let server = Arc::new(build_server(ctx)?);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = build_service(server);
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
