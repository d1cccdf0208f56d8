// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Request handlers
//!
//! Custom requests the editor sends to manage plugins and connections.
//! Every handler resolves its driver instance through the connection
//! manager, so requests on one connection are served in arrival order.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlhub_driver::{
    CompletionMap, ConnectionConfig, ContextValue, QueryOptions, ResultEnvelope, SearchableItem,
    TreeNode,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::ServerContext;
use crate::error::{ServerError, ServerResult};
use crate::router::typed;
use crate::server::ProtocolServer;

/// Method names of the custom requests
pub mod methods {
    pub const REGISTER_PLUGIN: &str = "ls/RegisterPlugin";
    pub const GET_RESOURCES: &str = "ls/GetResources";
    pub const CONNECT: &str = "connection/Connect";
    pub const DISCONNECT: &str = "connection/Disconnect";
    pub const TEST_CONNECTION: &str = "connection/TestConnection";
    pub const QUERY: &str = "connection/Query";
    pub const CANCEL_QUERY: &str = "connection/CancelQuery";
    pub const GET_CHILDREN_FOR_ITEM: &str = "connection/GetChildrenForItem";
    pub const SEARCH: &str = "connection/Search";
    pub const GET_STATIC_COMPLETIONS: &str = "connection/GetStaticCompletions";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPluginParams {
    /// Locator or name of a bundled plugin
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetResourcesParams {
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParams {
    pub conn_info: ConnectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    pub conn_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub conn_info: ConnectionConfig,
    pub query: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQueryParams {
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelQueryResult {
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenParams {
    pub conn_info: ConnectionConfig,
    pub item: TreeNode,
    #[serde(default)]
    pub parent: Option<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub conn_info: ConnectionConfig,
    pub item_type: ContextValue,
    pub search: String,
    #[serde(default)]
    pub extra_params: Value,
}

/// Register every custom request on `server`
pub fn register_all(server: &mut ProtocolServer) -> ServerResult<()> {
    server.on_request(methods::REGISTER_PLUGIN, typed(register_plugin))?;
    server.on_request(methods::GET_RESOURCES, typed(get_resources))?;
    server.on_request(methods::CONNECT, typed(connect))?;
    server.on_request(methods::DISCONNECT, typed(disconnect))?;
    server.on_request(methods::TEST_CONNECTION, typed(test_connection))?;
    server.on_request(methods::QUERY, typed(query))?;
    server.on_request(methods::CANCEL_QUERY, typed(cancel_query))?;
    server.on_request(methods::GET_CHILDREN_FOR_ITEM, typed(get_children_for_item))?;
    server.on_request(methods::SEARCH, typed(search))?;
    server.on_request(methods::GET_STATIC_COMPLETIONS, typed(get_static_completions))?;
    Ok(())
}

async fn register_plugin(ctx: Arc<ServerContext>, params: RegisterPluginParams) -> ServerResult<()> {
    let plugin = ctx.plugins().find(&params.path).ok_or_else(|| {
        ServerError::invalid_action(format!("No plugin found at '{}'", params.path))
    })?;
    ctx.install_plugin(plugin.as_ref()).await
}

async fn get_resources(
    ctx: Arc<ServerContext>,
    params: GetResourcesParams,
) -> ServerResult<BTreeMap<String, Value>> {
    Ok(ctx.resources(params.alias.as_deref()).await)
}

async fn connect(ctx: Arc<ServerContext>, params: ConnectionParams) -> ServerResult<ConnectResult> {
    let registry = ctx.drivers().await;
    let conn_id = ctx.connections().connect(&registry, &params.conn_info).await?;
    Ok(ConnectResult { conn_id })
}

async fn disconnect(ctx: Arc<ServerContext>, params: ConnectionParams) -> ServerResult<bool> {
    Ok(ctx
        .connections()
        .disconnect(&params.conn_info.connection_id())
        .await?)
}

/// Check reachability on a throwaway instance
async fn test_connection(ctx: Arc<ServerContext>, params: ConnectionParams) -> ServerResult<()> {
    let mut driver = ctx.create_detached(&params.conn_info).await?;
    driver.set_limits(ctx.config().await.pagination_limits());
    let result = driver.test_connection().await;
    driver.close().await?;
    result?;
    info!(id = %driver.id(), "Connection test succeeded");
    Ok(())
}

async fn query(ctx: Arc<ServerContext>, params: QueryParams) -> ServerResult<Vec<ResultEnvelope>> {
    let request_id = params
        .request_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let options = QueryOptions {
        request_id: Some(request_id.clone()),
        cancel: CancellationToken::new(),
        limits: ctx.config().await.pagination_limits(),
    };
    debug!(request_id = %request_id, "Running query");

    let registry = ctx.drivers().await;
    Ok(ctx
        .connections()
        .query(&registry, &params.conn_info, &params.query, options)
        .await?)
}

async fn cancel_query(
    ctx: Arc<ServerContext>,
    params: CancelQueryParams,
) -> ServerResult<CancelQueryResult> {
    Ok(CancelQueryResult {
        cancelled: ctx.connections().cancel(&params.request_id).await,
    })
}

async fn get_children_for_item(
    ctx: Arc<ServerContext>,
    params: ChildrenParams,
) -> ServerResult<Vec<TreeNode>> {
    let limits = ctx.config().await.pagination_limits();
    let registry = ctx.drivers().await;
    let driver = ctx
        .connections()
        .get_or_create(&registry, &params.conn_info)
        .await?;
    let mut driver = driver.lock().await;
    driver.set_limits(limits);
    Ok(driver
        .get_children_for_item(&params.item, params.parent.as_ref())
        .await?)
}

async fn search(
    ctx: Arc<ServerContext>,
    params: SearchParams,
) -> ServerResult<Vec<SearchableItem>> {
    let limits = ctx.config().await.pagination_limits();
    let registry = ctx.drivers().await;
    let driver = ctx
        .connections()
        .get_or_create(&registry, &params.conn_info)
        .await?;
    let mut driver = driver.lock().await;
    driver.set_limits(limits);
    Ok(driver
        .search_items(params.item_type, &params.search, &params.extra_params)
        .await?)
}

async fn get_static_completions(
    ctx: Arc<ServerContext>,
    params: ConnectionParams,
) -> ServerResult<CompletionMap> {
    let limits = ctx.config().await.pagination_limits();
    let registry = ctx.drivers().await;
    let driver = ctx
        .connections()
        .get_or_create(&registry, &params.conn_info)
        .await?;
    let mut driver = driver.lock().await;
    driver.set_limits(limits);
    let completions = driver.get_static_completions().await?;
    Ok(completions.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_params_wire_names() {
        let params: QueryParams = serde_json::from_value(json!({
            "connInfo": { "name": "local", "driver": "pg", "server": "localhost" },
            "query": "SELECT 1",
            "requestId": "req-9"
        }))
        .unwrap();
        assert_eq!(params.conn_info.connection_id(), "pg|local");
        assert_eq!(params.conn_info.settings["server"], json!("localhost"));
        assert_eq!(params.request_id.as_deref(), Some("req-9"));
    }

    #[test]
    fn test_search_params_default_extra() {
        let params: SearchParams = serde_json::from_value(json!({
            "connInfo": { "name": "local", "driver": "pg" },
            "itemType": "connection.table",
            "search": "use"
        }))
        .unwrap();
        assert_eq!(params.item_type, ContextValue::Table);
        assert!(params.extra_params.is_null());
    }
}
