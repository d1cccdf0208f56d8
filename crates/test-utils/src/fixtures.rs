// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures: connection configs, explorer nodes and sample SQL

use serde_json::{Value, json};
use sqlhub_driver::{ConnectionConfig, ContextValue, Row, TreeNode};

/// Sample connections and SQL for testing
pub struct Fixtures;

impl Fixtures {
    // ===== Connections =====

    /// Connection served by the mock driver
    pub fn mock_connection(name: &str) -> ConnectionConfig {
        ConnectionConfig::new(name, "mock")
    }

    /// Redshift Data API connection to cluster `analytics`
    pub fn redshift_connection() -> ConnectionConfig {
        ConnectionConfig::new("warehouse", "RedshiftData")
            .with_setting("clusterIdentifier", "analytics")
            .with_setting("database", "dev")
            .with_setting("dbUser", "awsuser")
            .with_setting("region", "us-east-1")
    }

    /// PostgreSQL connection to localhost
    pub fn pg_connection() -> ConnectionConfig {
        ConnectionConfig::new("local", "pg")
            .with_setting("server", "localhost")
            .with_setting("port", 5432)
            .with_setting("database", "postgres")
            .with_setting("username", "postgres")
            .with_setting("password", "postgres")
    }

    // ===== Explorer nodes =====

    pub fn database() -> TreeNode {
        TreeNode::new("dev", ContextValue::Database).with_database("dev")
    }

    pub fn schema() -> TreeNode {
        TreeNode::new("public", ContextValue::Schema)
            .with_database("dev")
            .with_schema("public")
    }

    pub fn table() -> TreeNode {
        TreeNode::new("users", ContextValue::Table)
            .with_database("dev")
            .with_schema("public")
    }

    // ===== SQL =====

    pub const fn multi_statement() -> &'static str {
        "SELECT 1; UPDATE users SET name = 'a;b' WHERE id = 1"
    }

    pub const fn syntax_error() -> &'static str {
        "SELEC 1"
    }
}

/// Convert a JSON object literal into a [`Row`]
pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

/// Keyword catalog rows as returned by the keywords template
pub fn keyword_rows() -> Vec<Row> {
    vec![
        row(json!({"label": "SELECT", "desc": "RESERVED"})),
        row(json!({"label": "ABORT", "desc": "UNRESERVED"})),
        row(json!({"label": "CREATE", "desc": "RESERVED"})),
    ]
}
