// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Metadata query templates.
//!
//! Each driver ships a dialect-specific implementation. The explorer only
//! cares that every template returns rows decodable as [`TreeNode`]s (or, for
//! keywords, rows with `label` and `desc` columns).

use crate::model::TreeNode;

/// Default row limit for free-text searches
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Generates the SQL text used to browse and search a backend
pub trait QueryTemplates: Send + Sync {
    /// Databases reachable from the connection
    fn fetch_databases(&self) -> String;

    /// Schemas of `database`
    fn fetch_schemas(&self, database: &TreeNode) -> String;

    /// Tables of `schema`
    fn fetch_tables(&self, schema: &TreeNode) -> String;

    /// Views of `schema`
    fn fetch_views(&self, schema: &TreeNode) -> String;

    /// Materialized views of `schema`
    fn fetch_materialized_views(&self, schema: &TreeNode) -> String;

    /// Functions of `schema`
    fn fetch_functions(&self, schema: &TreeNode) -> String;

    /// Columns of a table, view or materialized view
    fn fetch_columns(&self, table: &TreeNode) -> String;

    /// Tables whose name matches `search`
    fn search_tables(&self, search: &str, limit: usize) -> String;

    /// Columns whose name matches `search`, optionally within `tables`
    fn search_columns(&self, search: &str, tables: &[TreeNode], limit: usize) -> String;

    /// Keyword catalog with `label` and `desc` columns
    fn fetch_keywords(&self) -> String;
}
