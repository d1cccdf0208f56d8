// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # PostgreSQL driver
//!
//! Holds one `tokio-postgres` session per connection. Statements run in
//! simple-query mode, so every value comes back in its text form.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlhub_driver::normalize::{map_rows, unique_column_names};
use sqlhub_driver::{
    CompletionCache, CompletionMap, ConnectionConfig, ConnectionDriver, ContextValue,
    DriverError, DriverResult, EnvelopeContext, HandleSlot, MetadataSource, QueryOptions,
    QueryTemplates, ResultEnvelope, Row, SearchableItem, StatementOutput, TreeNode,
    children_for_item, load_static_completions, normalize_batch, search_items, split_statements,
    statement_command,
};
use tokio_postgres::error::ErrorPosition;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credentials::PgCredentials;
use crate::queries::PgQueries;

/// Routine Postgres reports for lexer and grammar errors
const SCANNER_ROUTINE: &str = "scanner_yyerror";

/// Driver for one PostgreSQL database
pub struct PgDriver {
    id: String,
    credentials: PgCredentials,
    handle: HandleSlot<Arc<Client>>,
    queries: PgQueries,
    completions: CompletionCache,
}

impl std::fmt::Debug for PgDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDriver")
            .field("id", &self.id)
            .field("server", &self.credentials.server)
            .field("database", &self.credentials.database)
            .field("open", &self.handle.is_open())
            .finish()
    }
}

impl PgDriver {
    pub fn new(config: &ConnectionConfig) -> DriverResult<Self> {
        Ok(Self {
            id: config.connection_id(),
            credentials: config.credentials()?,
            handle: HandleSlot::new(),
            queries: PgQueries,
            completions: CompletionCache::new(),
        })
    }

    pub fn credentials(&self) -> &PgCredentials {
        &self.credentials
    }

    /// Current session, connecting if there is none or it has dropped
    async fn connection(&mut self) -> DriverResult<Arc<Client>> {
        if let Some(client) = self.handle.get() {
            if !client.is_closed() {
                return Ok(client);
            }
            debug!(id = %self.id, "Session dropped, reconnecting");
        }

        let (client, connection) = self
            .credentials
            .to_config()
            .connect(NoTls)
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        let id = self.id.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(id = %id, "Postgres session ended: {}", e);
            }
        });

        info!(
            id = %self.id,
            server = %self.credentials.server,
            database = %self.credentials.database,
            "Postgres session opened"
        );
        Ok(self.handle.set(Arc::new(client)))
    }

    async fn run_statements(
        &mut self,
        statements: &[String],
        cancel: &CancellationToken,
    ) -> DriverResult<Vec<StatementOutput>> {
        let client = self.connection().await?;
        let mut outputs = Vec::with_capacity(statements.len());
        for statement in statements {
            let messages = simple_query(&client, statement, cancel).await?;
            outputs.push(collect_output(statement, messages));
        }
        Ok(outputs)
    }
}

/// Run `sql`, asking the server to cancel it if `cancel` fires first
async fn simple_query(
    client: &Client,
    sql: &str,
    cancel: &CancellationToken,
) -> DriverResult<Vec<SimpleQueryMessage>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            if let Err(e) = client.cancel_token().cancel_query(NoTls).await {
                warn!("Cancel request failed: {}", e);
            }
            Err(DriverError::Cancelled)
        }
        result = client.simple_query(sql) => result.map_err(pg_error),
    }
}

/// Fold the messages of one statement into its output
fn collect_output(statement: &str, messages: Vec<SimpleQueryMessage>) -> StatementOutput {
    let mut output = StatementOutput {
        command: statement_command(statement),
        ..Default::default()
    };
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                if output.fields.is_empty() {
                    output.fields = columns.iter().map(|c| c.name().to_string()).collect();
                }
            }
            SimpleQueryMessage::Row(row) => {
                if output.fields.is_empty() {
                    output.fields = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                output.rows.push(
                    (0..row.len())
                        .map(|i| row.get(i).map_or(Value::Null, |v| Value::String(v.to_string())))
                        .collect(),
                );
            }
            SimpleQueryMessage::CommandComplete(count) => output.row_count = Some(count),
            _ => {}
        }
    }
    output
}

/// Convert a client error, keeping the server's diagnostics as raw payload
fn pg_error(err: tokio_postgres::Error) -> DriverError {
    let Some(db) = err.as_db_error() else {
        if err.is_closed() {
            return DriverError::Connection(err.to_string());
        }
        return DriverError::execution(err.to_string());
    };

    let position = match (db.routine(), db.position()) {
        (Some(SCANNER_ROUTINE), Some(ErrorPosition::Original(position))) => Some(*position),
        _ => None,
    };
    let raw = json!({
        "severity": db.severity(),
        "code": db.code().code(),
        "message": db.message(),
        "detail": db.detail(),
        "hint": db.hint(),
        "position": position,
        "routine": db.routine(),
    });
    DriverError::Execution {
        message: db.message().to_string(),
        position,
        raw: Some(raw),
    }
}

#[async_trait]
impl MetadataSource for PgDriver {
    fn queries(&self) -> &dyn QueryTemplates {
        &self.queries
    }

    async fn query_results(&mut self, sql: &str) -> DriverResult<Vec<Row>> {
        let client = self.connection().await?;
        let messages = client.simple_query(sql).await.map_err(pg_error)?;
        let output = collect_output(sql, messages);
        let cols = unique_column_names(&output.fields);
        map_rows(&cols, output.rows)
    }
}

#[async_trait]
impl ConnectionDriver for PgDriver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> DriverResult<()> {
        self.connection().await.map(|_| ())
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.handle.take().is_some() {
            info!(id = %self.id, "Postgres session closed");
        }
        Ok(())
    }

    async fn query(&mut self, text: &str, options: QueryOptions) -> Vec<ResultEnvelope> {
        let ctx = EnvelopeContext::new(self.id.clone(), options.request_id.clone());
        let statements = split_statements(text);
        let outputs = self.run_statements(&statements, &options.cancel).await;
        normalize_batch(&ctx, text, &statements, outputs)
    }

    async fn test_connection(&mut self) -> DriverResult<()> {
        let client = self.connection().await?;
        client.simple_query("SELECT 1").await.map_err(pg_error)?;
        Ok(())
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
}

/// Constructor registered under every PostgreSQL alias
pub fn construct(config: ConnectionConfig) -> DriverResult<Box<dyn ConnectionDriver>> {
    PgDriver::new(&config).map(|d| Box::new(d) as Box<dyn ConnectionDriver>)
}
