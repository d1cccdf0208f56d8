// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Connection explorer tree resolution
//!
//! Maps a node's kind to the action producing its children, independent of
//! how the editor renders them.
//!
//! ```text
//! CONNECTION ─► DATABASE ─► "Schemas" ─► SCHEMA ─┬► "Tables" ─────────────► TABLE ─► COLUMN
//!                                                ├► "Views" ──────────────► VIEW ──► COLUMN
//!                                                ├► "Materialized Views" ─► MATERIALIZED_VIEW ─► COLUMN
//!                                                └► "Functions" ──────────► FUNCTION
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::DriverResult;
use crate::model::{ContextValue, Row, SearchableItem, TreeNode};
use crate::queries::{DEFAULT_SEARCH_LIMIT, QueryTemplates};

/// A backend that can run metadata queries
#[async_trait]
pub trait MetadataSource: Send {
    /// Templates for this backend's dialect
    fn queries(&self) -> &dyn QueryTemplates;

    /// Run a metadata query and return its rows
    async fn query_results(&mut self, sql: &str) -> DriverResult<Vec<Row>>;
}

/// Children of `item` in the explorer tree
///
/// `parent` is the node `item` hangs from; group nodes query against it.
/// Kinds without children resolve to an empty list.
pub async fn children_for_item<S>(
    source: &mut S,
    item: &TreeNode,
    parent: Option<&TreeNode>,
) -> DriverResult<Vec<TreeNode>>
where
    S: MetadataSource + ?Sized,
{
    debug!(label = %item.label, kind = item.kind.as_str(), "Resolving children");
    match item.kind {
        ContextValue::Connection | ContextValue::ConnectedConnection => {
            let sql = source.queries().fetch_databases();
            query_nodes(source, &sql).await
        }
        ContextValue::Database => Ok(vec![TreeNode::group("Schemas", ContextValue::Schema)]),
        ContextValue::Schema => Ok(schema_groups()),
        ContextValue::ResourceGroup => children_for_group(source, item, parent).await,
        ContextValue::Table | ContextValue::View | ContextValue::MaterializedView => {
            columns_for(source, item).await
        }
        ContextValue::Function | ContextValue::Column | ContextValue::NoChild => Ok(Vec::new()),
    }
}

/// The four folders listed under every schema
pub fn schema_groups() -> Vec<TreeNode> {
    vec![
        TreeNode::group("Tables", ContextValue::Table),
        TreeNode::group("Views", ContextValue::View),
        TreeNode::group("Materialized Views", ContextValue::MaterializedView),
        TreeNode::group("Functions", ContextValue::Function),
    ]
}

async fn children_for_group<S>(
    source: &mut S,
    group: &TreeNode,
    parent: Option<&TreeNode>,
) -> DriverResult<Vec<TreeNode>>
where
    S: MetadataSource + ?Sized,
{
    let parent = parent.unwrap_or(group);
    let Some(child_type) = group.child_type else {
        return Ok(Vec::new());
    };

    let queries = source.queries();
    let sql = match child_type {
        ContextValue::Schema => queries.fetch_schemas(parent),
        ContextValue::Table => queries.fetch_tables(parent),
        ContextValue::View => queries.fetch_views(parent),
        ContextValue::MaterializedView => queries.fetch_materialized_views(parent),
        ContextValue::Function => queries.fetch_functions(parent),
        ContextValue::Connection
        | ContextValue::ConnectedConnection
        | ContextValue::Database
        | ContextValue::ResourceGroup
        | ContextValue::Column
        | ContextValue::NoChild => return Ok(Vec::new()),
    };
    query_nodes(source, &sql).await
}

async fn columns_for<S>(source: &mut S, table: &TreeNode) -> DriverResult<Vec<TreeNode>>
where
    S: MetadataSource + ?Sized,
{
    let sql = source.queries().fetch_columns(table);
    let columns = query_nodes(source, &sql).await?;
    Ok(columns
        .into_iter()
        .map(|mut column| {
            column.icon_name = if column.is_pk {
                Some("pk".to_string())
            } else if column.is_fk {
                Some("fk".to_string())
            } else {
                None
            };
            column.child_type = Some(ContextValue::NoChild);
            column.table = Some(table.label.clone());
            column
        })
        .collect())
}

/// Free-text search over tables or columns
///
/// `extra` may carry `limit` and, for columns, the `tables` to search in.
pub async fn search_items<S>(
    source: &mut S,
    kind: ContextValue,
    search: &str,
    extra: &Value,
) -> DriverResult<Vec<SearchableItem>>
where
    S: MetadataSource + ?Sized,
{
    let limit = extra
        .get("limit")
        .and_then(Value::as_u64)
        .map(|l| l as usize)
        .unwrap_or(DEFAULT_SEARCH_LIMIT);

    let sql = match kind {
        ContextValue::Table => source.queries().search_tables(search, limit),
        ContextValue::Column => {
            let tables: Vec<TreeNode> = extra
                .get("tables")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            source.queries().search_columns(search, &tables, limit)
        }
        _ => return Ok(Vec::new()),
    };
    query_nodes(source, &sql).await
}

async fn query_nodes<S>(source: &mut S, sql: &str) -> DriverResult<Vec<TreeNode>>
where
    S: MetadataSource + ?Sized,
{
    source
        .query_results(sql)
        .await?
        .into_iter()
        .map(TreeNode::from_row)
        .collect()
}
