// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! End-to-end tests of the Redshift Data driver over a scripted statement API

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use sqlhub_driver::{
    ConnectionDriver, ContextValue, DriverError, DriverResult, PaginationLimits, QueryOptions,
    SubmitPollBackend, TreeNode,
};
use sqlhub_driver_redshift_data::{DataApiConnector, RedshiftDataCredentials, RedshiftDataDriver};
use sqlhub_test_utils::{Fixtures, ScriptedStatementApi};
use tokio_util::sync::CancellationToken;

/// Hands out the same scripted API and counts connects
struct ScriptedConnector {
    api: Arc<ScriptedStatementApi>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    fn new(api: ScriptedStatementApi) -> Arc<Self> {
        Arc::new(Self {
            api: Arc::new(api),
            connects: AtomicUsize::new(0),
        })
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataApiConnector for ScriptedConnector {
    async fn connect(
        &self,
        _credentials: &RedshiftDataCredentials,
    ) -> DriverResult<Arc<dyn SubmitPollBackend>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.api.clone())
    }
}

struct RefusingConnector;

#[async_trait]
impl DataApiConnector for RefusingConnector {
    async fn connect(
        &self,
        _credentials: &RedshiftDataCredentials,
    ) -> DriverResult<Arc<dyn SubmitPollBackend>> {
        Err(DriverError::Connection("no route to host".to_string()))
    }
}

fn driver(connector: Arc<dyn DataApiConnector>) -> RedshiftDataDriver {
    RedshiftDataDriver::with_connector(&Fixtures::redshift_connection(), connector).unwrap()
}

#[tokio::test]
async fn test_select_one_end_to_end() {
    let connector = ScriptedConnector::new(
        ScriptedStatementApi::new().with_pages(&["?column?"], vec![vec![vec![json!(1)]]]),
    );
    let mut driver = driver(connector.clone());

    let results = driver.query("SELECT 1", QueryOptions::new("req-1")).await;

    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.api.counters.submits(), 1);
    assert!(connector.api.counters.fetches() >= 1);
    assert_eq!(results.len(), 1);

    let envelope = &results[0];
    assert!(!envelope.error);
    assert_eq!(envelope.request_id.as_deref(), Some("req-1"));
    assert_eq!(envelope.conn_id, "RedshiftData|warehouse");
    assert_eq!(envelope.query, "SELECT 1");
    assert_eq!(envelope.cols, vec!["?column?"]);
    assert_eq!(envelope.results, vec![sqlhub_test_utils::row(json!({"?column?": 1}))]);
    assert_eq!(envelope.messages[0].message, "SELECT successfully executed.");
}

#[tokio::test]
async fn test_open_is_idempotent_and_close_releases() {
    let connector = ScriptedConnector::new(ScriptedStatementApi::new());
    let mut driver = driver(connector.clone());

    driver.open().await.unwrap();
    driver.open().await.unwrap();
    assert_eq!(connector.connects(), 1);

    driver.close().await.unwrap();
    driver.close().await.unwrap();
    driver.open().await.unwrap();
    assert_eq!(connector.connects(), 2);
}

#[tokio::test]
async fn test_multi_statement_batch_yields_one_envelope_each() {
    let connector = ScriptedConnector::new(
        ScriptedStatementApi::new().with_pages(&["n"], vec![vec![vec![json!(1)]]]),
    );
    let mut driver = driver(connector.clone());

    let results = driver
        .query(Fixtures::multi_statement(), QueryOptions::new("req-2"))
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].query, "SELECT 1");
    assert_eq!(
        results[1].query,
        "UPDATE users SET name = 'a;b' WHERE id = 1"
    );
    assert_ne!(results[0].result_id, results[1].result_id);
    assert_eq!(connector.api.submitted().len(), 2);
}

#[tokio::test]
async fn test_failed_statement_becomes_single_error_envelope() {
    let raw = json!({"Status": "FAILED", "Error": "ERROR: syntax error at or near \"SELEC\""});
    let connector = ScriptedConnector::new(
        ScriptedStatementApi::new().with_failure("ERROR: syntax error at or near \"SELEC\"", Some(raw.clone())),
    );
    let mut driver = driver(connector);

    let results = driver
        .query(Fixtures::syntax_error(), QueryOptions::new("req-3"))
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].error);
    assert!(results[0].cols.is_empty());
    assert!(results[0].results.is_empty());
    assert_eq!(results[0].raw_error, Some(raw));
}

#[tokio::test]
async fn test_query_on_unreachable_backend_never_fails() {
    let mut driver = driver(Arc::new(RefusingConnector));
    let results = driver.query("SELECT 1", QueryOptions::new("req-4")).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].error);
    assert!(results[0].messages[0].message.contains("no route to host"));

    let err = driver.test_connection().await.unwrap_err();
    assert!(matches!(err, DriverError::Connection(_)));
}

#[tokio::test]
async fn test_cancelled_query_reports_cancellation() {
    let connector = ScriptedConnector::new(ScriptedStatementApi::new().with_running_polls(1_000));
    let mut driver = driver(connector.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let results = driver
        .query("SELECT 1", QueryOptions::new("req-5").with_cancel(cancel))
        .await;
    assert!(results[0].error);
    assert_eq!(results[0].messages[0].message, "Request cancelled");
    assert_eq!(connector.api.counters.submits(), 0);
}

#[tokio::test]
async fn test_table_columns_through_explorer() {
    let connector = ScriptedConnector::new(ScriptedStatementApi::new().with_pages(
        &["label", "type", "table", "datatype", "ispk", "isfk"],
        vec![vec![
            vec![json!("id"), json!("connection.column"), json!("users"), json!("integer"), json!(true), json!(false)],
            vec![json!("team_id"), json!("connection.column"), json!("users"), json!("integer"), json!(false), json!(true)],
        ]],
    ));
    let mut driver = driver(connector.clone());

    let columns = driver
        .get_children_for_item(&Fixtures::table(), None)
        .await
        .unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].icon_name.as_deref(), Some("pk"));
    assert_eq!(columns[1].icon_name.as_deref(), Some("fk"));
    assert_eq!(columns[0].child_type, Some(ContextValue::NoChild));
    assert!(connector.api.submitted()[0].contains("svv_all_columns"));

    let groups = driver
        .get_children_for_item(&TreeNode::new("public", ContextValue::Schema), None)
        .await
        .unwrap();
    assert_eq!(groups.len(), 4);
    assert_eq!(connector.api.counters.submits(), 1);
}

#[tokio::test]
async fn test_static_completions_are_loaded_once() {
    let connector = ScriptedConnector::new(ScriptedStatementApi::new().with_pages(
        &["label", "desc"],
        vec![vec![
            vec![json!("SELECT"), json!("RESERVED")],
            vec![json!("ABORT"), json!("UNRESERVED")],
        ]],
    ));
    let mut driver = driver(connector.clone());

    let first = driver.get_static_completions().await.unwrap();
    let second = driver.get_static_completions().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connector.api.counters.submits(), 1);
    assert_eq!(first["SELECT"].sort_text, "2:SELECT");
    assert_eq!(first["ABORT"].sort_text, "ABORT");
}

#[tokio::test]
async fn test_explorer_lookups_follow_applied_limits() {
    let connector = ScriptedConnector::new(ScriptedStatementApi::new().with_pages(
        &["label", "type"],
        vec![
            vec![vec![json!("dev"), json!("connection.database")]],
            vec![vec![json!("prod"), json!("connection.database")]],
        ],
    ));
    let mut driver = driver(connector.clone());
    driver.set_limits(PaginationLimits {
        max_pages: 1,
        ..PaginationLimits::default()
    });

    let err = driver
        .get_children_for_item(&TreeNode::new("warehouse", ContextValue::ConnectedConnection), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::Pagination { .. }));
    assert_eq!(driver.limits().max_pages, 1);
}
