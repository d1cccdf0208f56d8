// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Wire-level data model
//!
//! Types exchanged between the server, the drivers and the editor client:
//! connection configs, explorer tree nodes, result envelopes and completion
//! entries. All of them serialize with camelCase field names.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lsp_types::MarkupContent;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DriverError, DriverResult};

/// A result row: column display name to value, in column order
pub type Row = Map<String, Value>;

/// Items returned by `search_items`
pub type SearchableItem = TreeNode;

/// Static completions keyed by keyword label
pub type CompletionMap = BTreeMap<String, CompletionEntry>;

/// Node kinds of the connection explorer tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextValue {
    #[serde(rename = "connection")]
    Connection,
    #[serde(rename = "connectedConnection")]
    ConnectedConnection,
    #[serde(rename = "connection.database")]
    Database,
    #[serde(rename = "connection.resource_group")]
    ResourceGroup,
    #[serde(rename = "connection.schema")]
    Schema,
    #[serde(rename = "connection.table")]
    Table,
    #[serde(rename = "connection.view")]
    View,
    #[serde(rename = "connection.materializedView")]
    MaterializedView,
    #[serde(rename = "connection.function")]
    Function,
    #[serde(rename = "connection.column")]
    Column,
    #[serde(rename = "NO_CHILD")]
    NoChild,
}

impl ContextValue {
    /// Wire name of this kind, as used in metadata templates
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextValue::Connection => "connection",
            ContextValue::ConnectedConnection => "connectedConnection",
            ContextValue::Database => "connection.database",
            ContextValue::ResourceGroup => "connection.resource_group",
            ContextValue::Schema => "connection.schema",
            ContextValue::Table => "connection.table",
            ContextValue::View => "connection.view",
            ContextValue::MaterializedView => "connection.materializedView",
            ContextValue::Function => "connection.function",
            ContextValue::Column => "connection.column",
            ContextValue::NoChild => "NO_CHILD",
        }
    }
}

/// A node of the connection explorer tree
///
/// Metadata templates select columns named after these fields; any column
/// without a matching field lands in `extra`. Lowercase aliases cover
/// backends that fold unquoted and quoted identifiers alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ContextValue,
    #[serde(default, alias = "childtype", skip_serializing_if = "Option::is_none")]
    pub child_type: Option<ContextValue>,
    #[serde(default, alias = "iconid", skip_serializing_if = "Option::is_none")]
    pub icon_id: Option<String>,
    #[serde(default, alias = "iconname", skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, alias = "datatype", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, alias = "ispk", deserialize_with = "flexible_bool")]
    pub is_pk: bool,
    #[serde(default, alias = "isfk", deserialize_with = "flexible_bool")]
    pub is_fk: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TreeNode {
    /// Create a bare node of the given kind
    pub fn new(label: impl Into<String>, kind: ContextValue) -> Self {
        Self {
            label: label.into(),
            kind,
            child_type: None,
            icon_id: None,
            icon_name: None,
            database: None,
            schema: None,
            table: None,
            data_type: None,
            detail: None,
            is_pk: false,
            is_fk: false,
            extra: Map::new(),
        }
    }

    /// Synthetic folder node grouping children of `child_type`
    pub fn group(label: impl Into<String>, child_type: ContextValue) -> Self {
        let mut node = Self::new(label, ContextValue::ResourceGroup);
        node.icon_id = Some("folder".to_string());
        node.child_type = Some(child_type);
        node
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_child_type(mut self, child_type: ContextValue) -> Self {
        self.child_type = Some(child_type);
        self
    }

    /// Decode a metadata row into a node
    pub fn from_row(row: Row) -> DriverResult<Self> {
        serde_json::from_value(Value::Object(row))
            .map_err(|e| DriverError::execution(format!("Malformed metadata row: {}", e)))
    }
}

/// Accepts JSON booleans as well as the text forms Postgres returns in
/// simple-query mode ("t", "true", "1") and numeric flags.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "t" | "true" | "1" | "yes"),
        _ => false,
    })
}

/// A connection as configured in the editor
///
/// Everything besides `id`, `name` and `driver` is backend-specific and is
/// decoded into credentials by the driver itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub driver: String,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl ConnectionConfig {
    pub fn new(name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            driver: driver.into(),
            settings: Map::new(),
        }
    }

    /// Add a backend-specific setting
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Stable id used to key driver instances
    pub fn connection_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}|{}", self.driver, self.name),
        }
    }

    /// Decode the backend-specific settings
    pub fn credentials<T: DeserializeOwned>(&self) -> DriverResult<T> {
        serde_json::from_value(Value::Object(self.settings.clone())).map_err(|e| {
            DriverError::Configuration(format!("connection '{}': {}", self.name, e))
        })
    }
}

/// A human-readable message attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub message: String,
    pub date: DateTime<Utc>,
}

impl ResultMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            date: Utc::now(),
        }
    }
}

/// Normalized output of one executed statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub request_id: Option<String>,
    pub result_id: String,
    pub conn_id: String,
    pub cols: Vec<String>,
    pub messages: Vec<ResultMessage>,
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<Value>,
    pub query: String,
    pub results: Vec<Row>,
}

/// A static completion item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub label: String,
    pub detail: String,
    pub filter_text: String,
    pub sort_text: String,
    pub documentation: MarkupContent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_value_round_trips_wire_names() {
        let kinds = [
            ContextValue::Connection,
            ContextValue::ConnectedConnection,
            ContextValue::Database,
            ContextValue::ResourceGroup,
            ContextValue::Schema,
            ContextValue::Table,
            ContextValue::View,
            ContextValue::MaterializedView,
            ContextValue::Function,
            ContextValue::Column,
            ContextValue::NoChild,
        ];
        for kind in kinds {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, json!(kind.as_str()));
        }
    }

    #[test]
    fn test_tree_node_from_text_row() {
        let row = json!({
            "label": "id",
            "type": "connection.column",
            "table": "users",
            "dataType": "integer",
            "isPk": "t",
            "isFk": "f",
            "ordinal": "1"
        });
        let node = TreeNode::from_row(row.as_object().unwrap().clone()).unwrap();
        assert_eq!(node.kind, ContextValue::Column);
        assert!(node.is_pk);
        assert!(!node.is_fk);
        assert_eq!(node.extra.get("ordinal"), Some(&json!("1")));
    }

    #[test]
    fn test_tree_node_accepts_folded_column_names() {
        let row = json!({
            "label": "id",
            "type": "connection.column",
            "datatype": "int4",
            "ispk": true
        });
        let node = TreeNode::from_row(row.as_object().unwrap().clone()).unwrap();
        assert_eq!(node.data_type.as_deref(), Some("int4"));
        assert!(node.is_pk);
        assert!(node.extra.is_empty());
    }

    #[test]
    fn test_tree_node_from_row_without_label_fails() {
        let row = json!({"type": "connection.table"});
        assert!(TreeNode::from_row(row.as_object().unwrap().clone()).is_err());
    }

    #[test]
    fn test_connection_id_defaults_to_driver_and_name() {
        let conn = ConnectionConfig::new("warehouse", "RedshiftData");
        assert_eq!(conn.connection_id(), "RedshiftData|warehouse");

        let mut explicit = conn.clone();
        explicit.id = Some("abc".to_string());
        assert_eq!(explicit.connection_id(), "abc");
    }

    #[test]
    fn test_connection_config_flattens_settings() {
        let conn: ConnectionConfig = serde_json::from_value(json!({
            "name": "local",
            "driver": "pg",
            "server": "localhost",
            "port": 5432
        }))
        .unwrap();
        assert_eq!(conn.settings.get("server"), Some(&json!("localhost")));
        assert_eq!(conn.settings.get("port"), Some(&json!(5432)));
    }
}
