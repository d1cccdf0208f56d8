// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Redshift Data API implementation of [`ConnectionDriver`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlhub_driver::normalize::{map_rows, unique_column_names};
use sqlhub_driver::{
    CompletionCache, CompletionMap, ConnectionConfig, ConnectionDriver, ContextValue,
    DriverResult, EnvelopeContext, HandleSlot, MetadataSource, PaginatedExecutor,
    PaginationLimits, QueryOptions, QueryTemplates, ResultEnvelope, Row, SearchableItem,
    StatementOutput, SubmitPollBackend, TreeNode, children_for_item, load_static_completions,
    normalize_batch, search_items, split_statements, statement_command,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{DataApiConnector, HttpConnector};
use crate::credentials::RedshiftDataCredentials;
use crate::queries::RedshiftQueries;

type Handle = Arc<dyn SubmitPollBackend>;

/// Driver for one Redshift cluster database reached through the Data API
pub struct RedshiftDataDriver {
    id: String,
    credentials: RedshiftDataCredentials,
    connector: Arc<dyn DataApiConnector>,
    handle: HandleSlot<Handle>,
    queries: RedshiftQueries,
    completions: CompletionCache,
    limits: PaginationLimits,
}

impl std::fmt::Debug for RedshiftDataDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedshiftDataDriver")
            .field("id", &self.id)
            .field("cluster", &self.credentials.cluster_identifier)
            .field("database", &self.credentials.database)
            .field("open", &self.handle.is_open())
            .finish()
    }
}

impl RedshiftDataDriver {
    /// Build a driver talking HTTP to the Data API
    pub fn new(config: &ConnectionConfig) -> DriverResult<Self> {
        Self::with_connector(config, Arc::new(HttpConnector))
    }

    /// Build a driver whose handles come from `connector`
    pub fn with_connector(
        config: &ConnectionConfig,
        connector: Arc<dyn DataApiConnector>,
    ) -> DriverResult<Self> {
        Ok(Self {
            id: config.connection_id(),
            credentials: config.credentials()?,
            connector,
            handle: HandleSlot::new(),
            queries: RedshiftQueries,
            completions: CompletionCache::new(),
            limits: PaginationLimits::default(),
        })
    }

    pub fn credentials(&self) -> &RedshiftDataCredentials {
        &self.credentials
    }

    pub fn limits(&self) -> PaginationLimits {
        self.limits
    }

    /// Current handle, opening one if needed
    async fn connection(&mut self) -> DriverResult<Handle> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }
        let handle = self.connector.connect(&self.credentials).await?;
        info!(
            id = %self.id,
            cluster = %self.credentials.cluster_identifier,
            "Data API connection opened"
        );
        Ok(self.handle.set(handle))
    }

    async fn run_statements(
        &mut self,
        statements: &[String],
        options: &QueryOptions,
    ) -> DriverResult<Vec<StatementOutput>> {
        let handle = self.connection().await?;
        let executor = PaginatedExecutor::new(options.limits);

        let mut outputs = Vec::with_capacity(statements.len());
        for statement in statements {
            let paged = executor.run(handle.as_ref(), statement, &options.cancel).await?;
            debug!(pages = paged.pages, rows = paged.rows.len(), "Statement finished");
            outputs.push(StatementOutput {
                command: statement_command(statement),
                fields: paged.columns,
                rows: paged.rows,
                row_count: paged.rows_affected,
            });
        }
        Ok(outputs)
    }
}

#[async_trait]
impl MetadataSource for RedshiftDataDriver {
    fn queries(&self) -> &dyn QueryTemplates {
        &self.queries
    }

    async fn query_results(&mut self, sql: &str) -> DriverResult<Vec<Row>> {
        let handle = self.connection().await?;
        let paged = PaginatedExecutor::new(self.limits)
            .run(handle.as_ref(), sql, &CancellationToken::new())
            .await?;
        let cols = unique_column_names(&paged.columns);
        map_rows(&cols, paged.rows)
    }
}

#[async_trait]
impl ConnectionDriver for RedshiftDataDriver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> DriverResult<()> {
        self.connection().await.map(|_| ())
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.handle.take().is_some() {
            info!(id = %self.id, "Data API connection closed");
        }
        Ok(())
    }

    async fn query(&mut self, text: &str, options: QueryOptions) -> Vec<ResultEnvelope> {
        let ctx = EnvelopeContext::new(self.id.clone(), options.request_id.clone());
        let statements = split_statements(text);
        let outputs = self.run_statements(&statements, &options).await;
        normalize_batch(&ctx, text, &statements, outputs)
    }

    async fn test_connection(&mut self) -> DriverResult<()> {
        let handle = self.connection().await?;
        PaginatedExecutor::new(self.limits)
            .run(handle.as_ref(), "SELECT 1", &CancellationToken::new())
            .await
            .map(|_| ())
    }

    async fn get_children_for_item(
        &mut self,
        item: &TreeNode,
        parent: Option<&TreeNode>,
    ) -> DriverResult<Vec<TreeNode>> {
        children_for_item(self, item, parent).await
    }

    async fn search_items(
        &mut self,
        kind: ContextValue,
        search: &str,
        extra: &Value,
    ) -> DriverResult<Vec<SearchableItem>> {
        search_items(self, kind, search, extra).await
    }

    async fn get_static_completions(&mut self) -> DriverResult<Arc<CompletionMap>> {
        if let Some(cached) = self.completions.get() {
            return Ok(cached);
        }
        let loaded = load_static_completions(self).await?;
        Ok(self.completions.fill(loaded))
    }

    fn set_limits(&mut self, limits: PaginationLimits) {
        self.limits = limits;
    }
}

/// Constructor registered under every Redshift Data alias
pub fn construct(config: ConnectionConfig) -> DriverResult<Box<dyn ConnectionDriver>> {
    RedshiftDataDriver::new(&config).map(|d| Box::new(d) as Box<dyn ConnectionDriver>)
}
