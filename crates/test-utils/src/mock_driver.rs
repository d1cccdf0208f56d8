// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock driver implementation for testing
//!
//! Records every call in a shared [`DriverCalls`] log so tests can inspect
//! what the server did with the driver after handing it over.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use sqlhub_driver::{
    CompletionMap, ConnectionConfig, ConnectionDriver, ContextValue, DriverConstructor,
    DriverError, DriverResult, EnvelopeContext, PaginationLimits, QueryOptions, ResultEnvelope, SearchableItem,
    StatementOutput, TreeNode, completion_entry, normalize_batch, split_statements,
    statement_command,
};
use tracing::debug;

/// Call log shared between a mock driver and the test that created it
#[derive(Debug, Default)]
pub struct DriverCalls {
    pub created: usize,
    pub opens: usize,
    pub closes: usize,
    pub queries: Vec<String>,
    pub children_requests: Vec<String>,
    pub searches: Vec<String>,
    pub completion_loads: usize,
    /// Limits most recently handed to the driver
    pub limits: Option<PaginationLimits>,
}

/// Handle to a [`DriverCalls`] log
pub type SharedCalls = Arc<Mutex<DriverCalls>>;

/// Behaviour knobs for [`MockDriver`]
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// `open` fails with this error
    pub open_error: Option<DriverError>,
    /// `query` waits for cancellation instead of answering
    pub hang_queries: bool,
    /// Children returned per node kind
    pub children: HashMap<ContextValue, Vec<TreeNode>>,
    /// Keywords served as static completions
    pub keywords: Vec<(String, String)>,
}

/// In-memory driver that answers every statement with its own text
#[derive(Debug)]
pub struct MockDriver {
    id: String,
    open: bool,
    completions: Option<Arc<CompletionMap>>,
    behavior: MockBehavior,
    calls: SharedCalls,
}

impl MockDriver {
    pub fn new(config: &ConnectionConfig, behavior: MockBehavior, calls: SharedCalls) -> Self {
        if let Ok(mut log) = calls.lock() {
            log.created += 1;
        }
        debug!(id = %config.connection_id(), "Mock driver created");
        Self {
            id: config.connection_id(),
            open: false,
            completions: None,
            behavior,
            calls,
        }
    }

    /// Constructor registering mock drivers that share one call log
    pub fn constructor(behavior: MockBehavior, calls: SharedCalls) -> DriverConstructor {
        Arc::new(move |config| {
            Ok(Box::new(MockDriver::new(&config, behavior.clone(), calls.clone()))
                as Box<dyn ConnectionDriver>)
        })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn record(&self, f: impl FnOnce(&mut DriverCalls)) {
        if let Ok(mut log) = self.calls.lock() {
            f(&mut log);
        }
    }
}

#[async_trait::async_trait]
impl ConnectionDriver for MockDriver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> DriverResult<()> {
        if self.open {
            return Ok(());
        }
        if let Some(err) = &self.behavior.open_error {
            return Err(err.clone());
        }
        self.record(|log| log.opens += 1);
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.open {
            self.record(|log| log.closes += 1);
            self.open = false;
        }
        Ok(())
    }

    async fn query(&mut self, text: &str, options: QueryOptions) -> Vec<ResultEnvelope> {
        self.record(|log| log.queries.push(text.to_string()));
        let ctx = EnvelopeContext::new(self.id.clone(), options.request_id.clone());
        let statements = split_statements(text);

        let outputs = if self.behavior.hang_queries {
            options.cancel.cancelled().await;
            Err(DriverError::Cancelled)
        } else {
            match self.open().await {
                Ok(()) => Ok(statements
                    .iter()
                    .map(|statement| StatementOutput {
                        command: statement_command(statement),
                        fields: vec!["statement".to_string()],
                        rows: vec![vec![json!(statement)]],
                        row_count: Some(1),
                    })
                    .collect()),
                Err(err) => Err(err),
            }
        };
        normalize_batch(&ctx, text, &statements, outputs)
    }

    async fn test_connection(&mut self) -> DriverResult<()> {
        self.open().await
    }

    async fn get_children_for_item(
        &mut self,
        item: &TreeNode,
        _parent: Option<&TreeNode>,
    ) -> DriverResult<Vec<TreeNode>> {
        self.open().await?;
        self.record(|log| log.children_requests.push(item.label.clone()));
        Ok(self
            .behavior
            .children
            .get(&item.kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_items(
        &mut self,
        kind: ContextValue,
        search: &str,
        _extra: &Value,
    ) -> DriverResult<Vec<SearchableItem>> {
        self.open().await?;
        self.record(|log| log.searches.push(search.to_string()));
        Ok(self
            .behavior
            .children
            .get(&kind)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter(|n| n.label.contains(search))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_static_completions(&mut self) -> DriverResult<Arc<CompletionMap>> {
        if let Some(cached) = &self.completions {
            return Ok(cached.clone());
        }
        self.open().await?;
        self.record(|log| log.completion_loads += 1);
        let map: CompletionMap = self
            .behavior
            .keywords
            .iter()
            .map(|(label, category)| (label.clone(), completion_entry(label, category)))
            .collect();
        let map = Arc::new(map);
        self.completions = Some(map.clone());
        Ok(map)
    }

    fn set_limits(&mut self, limits: PaginationLimits) {
        self.record(|log| log.limits = Some(limits));
    }
}

/// Builder for mock driver behaviour with a fluent API
#[derive(Debug, Default)]
pub struct MockDriverBuilder {
    behavior: MockBehavior,
}

impl MockDriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open(mut self, err: DriverError) -> Self {
        self.behavior.open_error = Some(err);
        self
    }

    pub fn hanging_queries(mut self) -> Self {
        self.behavior.hang_queries = true;
        self
    }

    pub fn with_children(mut self, kind: ContextValue, nodes: Vec<TreeNode>) -> Self {
        self.behavior.children.insert(kind, nodes);
        self
    }

    pub fn with_keyword(mut self, label: &str, category: &str) -> Self {
        self.behavior
            .keywords
            .push((label.to_string(), category.to_string()));
        self
    }

    /// A small warehouse: one database with `public` holding `users`
    pub fn with_standard_tree(self) -> Self {
        self.with_children(
            ContextValue::ConnectedConnection,
            vec![TreeNode::new("dev", ContextValue::Database)],
        )
        .with_children(
            ContextValue::Connection,
            vec![TreeNode::new("dev", ContextValue::Database)],
        )
        .with_children(
            ContextValue::Table,
            vec![
                TreeNode::new("users", ContextValue::Table).with_schema("public"),
                TreeNode::new("orders", ContextValue::Table).with_schema("public"),
            ],
        )
    }

    pub fn build(self) -> MockBehavior {
        self.behavior
    }
}
