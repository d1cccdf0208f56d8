// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Result normalization
//!
//! Turns backend-native columns and rows into [`ResultEnvelope`]s:
//!
//! - duplicate column names get an occurrence suffix (`id`, `id (1)`, ...)
//! - rows are zipped with the column names, and an arity mismatch is an error
//! - successful statements get a completion message
//! - failures collapse into a single error envelope

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use uuid::Uuid;

use crate::error::{DriverError, DriverResult};
use crate::model::{ResultEnvelope, ResultMessage, Row};

/// Identity shared by every envelope produced for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeContext {
    pub request_id: Option<String>,
    pub conn_id: String,
}

impl EnvelopeContext {
    pub fn new(conn_id: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            request_id,
            conn_id: conn_id.into(),
        }
    }
}

/// Raw output of one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutput {
    /// Leading keyword, e.g. "SELECT"
    pub command: String,
    /// Field names as reported by the backend, duplicates included
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows affected, when the backend reports it
    pub row_count: Option<u64>,
}

/// Make column names unique
///
/// The first occurrence of a name is kept; the k-th repeat of `X` becomes
/// `"X (k)"`. When that name is already taken, k keeps counting up.
pub fn unique_column_names<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    let mut repeats: HashMap<&str, usize> = HashMap::new();
    let mut emitted: HashSet<String> = HashSet::with_capacity(fields.len());
    fields
        .iter()
        .map(|field| {
            let name = field.as_ref();
            let count = repeats.entry(name).or_insert(0);
            let mut display = name.to_string();
            if *count > 0 || emitted.contains(&display) {
                let mut k = (*count).max(1);
                display = format!("{} ({})", name, k);
                while emitted.contains(&display) {
                    k += 1;
                    display = format!("{} ({})", name, k);
                }
                *count = k;
            }
            *count += 1;
            emitted.insert(display.clone());
            display
        })
        .collect()
}

/// Zip each row with the column names
///
/// Every row must come out with exactly one entry per column.
pub fn map_rows(cols: &[String], rows: Vec<Vec<Value>>) -> DriverResult<Vec<Row>> {
    rows.into_iter()
        .enumerate()
        .map(|(index, values)| {
            if values.len() != cols.len() {
                return Err(DriverError::RowArityMismatch {
                    row: index,
                    expected: cols.len(),
                    found: values.len(),
                });
            }
            let row: Row = cols.iter().cloned().zip(values).collect();
            if row.len() != cols.len() {
                return Err(DriverError::RowArityMismatch {
                    row: index,
                    expected: cols.len(),
                    found: row.len(),
                });
            }
            Ok(row)
        })
        .collect()
}

/// Completion message for a successful statement
pub fn success_message(command: &str, row_count: Option<u64>) -> String {
    let command = if command.is_empty() { "Query" } else { command };
    let mut message = format!("{} successfully executed.", command);
    if !command.eq_ignore_ascii_case("select") {
        if let Some(count) = row_count {
            message.push_str(&format!(" {} rows were affected.", count));
        }
    }
    message
}

/// Message for a failed request
///
/// Syntax errors with a scanner position get `at character <n>` appended.
pub fn error_message(err: &DriverError) -> String {
    match err.position() {
        Some(position) => format!("{} at character {}", err, position),
        None => err.to_string(),
    }
}

/// Build the envelope for a successful statement
pub fn success_envelope(
    ctx: &EnvelopeContext,
    query: &str,
    output: StatementOutput,
) -> DriverResult<ResultEnvelope> {
    let cols = unique_column_names(&output.fields);
    let results = map_rows(&cols, output.rows)?;
    Ok(ResultEnvelope {
        request_id: ctx.request_id.clone(),
        result_id: Uuid::new_v4().to_string(),
        conn_id: ctx.conn_id.clone(),
        cols,
        messages: vec![ResultMessage::new(success_message(
            &output.command,
            output.row_count,
        ))],
        error: false,
        raw_error: None,
        query: query.to_string(),
        results,
    })
}

/// Build the single envelope reported for a failed request
pub fn error_envelope(ctx: &EnvelopeContext, query: &str, err: &DriverError) -> ResultEnvelope {
    ResultEnvelope {
        request_id: ctx.request_id.clone(),
        result_id: Uuid::new_v4().to_string(),
        conn_id: ctx.conn_id.clone(),
        cols: Vec::new(),
        messages: vec![ResultMessage::new(error_message(err))],
        error: true,
        raw_error: Some(err.raw_payload()),
        query: query.to_string(),
        results: Vec::new(),
    }
}

/// Normalize the outputs of a batch, or collapse a failure
///
/// `statements` and `outputs` are paired by position.
pub fn normalize_batch(
    ctx: &EnvelopeContext,
    query: &str,
    statements: &[String],
    outputs: DriverResult<Vec<StatementOutput>>,
) -> Vec<ResultEnvelope> {
    let envelopes = outputs.and_then(|outputs| {
        outputs
            .into_iter()
            .enumerate()
            .map(|(i, output)| {
                let text = statements.get(i).map(String::as_str).unwrap_or(query);
                success_envelope(ctx, text, output)
            })
            .collect::<DriverResult<Vec<_>>>()
    });

    match envelopes {
        Ok(envelopes) => envelopes,
        Err(err) => {
            tracing::debug!(conn_id = %ctx.conn_id, "Query failed: {}", err);
            vec![error_envelope(ctx, query, &err)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> EnvelopeContext {
        EnvelopeContext::new("pg|local", Some("req-1".to_string()))
    }

    #[test]
    fn test_unique_column_names_suffixes_repeats() {
        let names = unique_column_names(&["id", "name", "id", "id"]);
        assert_eq!(names, vec!["id", "name", "id (1)", "id (2)"]);
    }

    #[test]
    fn test_unique_column_names_skip_taken_suffixes() {
        let names = unique_column_names(&["id", "id (1)", "id"]);
        assert_eq!(names, vec!["id", "id (1)", "id (2)"]);

        let names = unique_column_names(&["id", "id", "id (1)"]);
        assert_eq!(names, vec!["id", "id (1)", "id (1) (1)"]);

        let cols = unique_column_names(&["id", "id (1)", "id"]);
        let rows = map_rows(&cols, vec![vec![json!(1), json!(2), json!(3)]]).unwrap();
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0].get("id (1)"), Some(&json!(2)));
        assert_eq!(rows[0].get("id (2)"), Some(&json!(3)));
    }

    #[test]
    fn test_map_rows_rejects_colliding_columns() {
        let cols = vec!["a".to_string(), "a".to_string()];
        let err = map_rows(&cols, vec![vec![json!(1), json!(2)]]).unwrap_err();
        assert!(matches!(
            err,
            DriverError::RowArityMismatch {
                row: 0,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_unique_column_names_without_duplicates() {
        let names = unique_column_names(&["a", "b"]);
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_map_rows_zips() {
        let cols = vec!["a".to_string(), "b".to_string()];
        let rows = map_rows(&cols, vec![vec![json!(1), json!(2)]]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(&json!(1)));
        assert_eq!(rows[0].get("b"), Some(&json!(2)));
        let keys: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_map_rows_rejects_arity_mismatch() {
        let cols = vec!["a".to_string(), "b".to_string()];
        let err = map_rows(&cols, vec![vec![json!(1), json!(2)], vec![json!(3)]]).unwrap_err();
        assert!(matches!(
            err,
            DriverError::RowArityMismatch {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_success_message_select_omits_count() {
        assert_eq!(
            success_message("SELECT", Some(3)),
            "SELECT successfully executed."
        );
    }

    #[test]
    fn test_success_message_dml_reports_count() {
        assert_eq!(
            success_message("UPDATE", Some(2)),
            "UPDATE successfully executed. 2 rows were affected."
        );
        assert_eq!(
            success_message("CREATE", None),
            "CREATE successfully executed."
        );
    }

    #[test]
    fn test_error_message_appends_position() {
        let err = DriverError::Execution {
            message: "syntax error at or near \"SELEC\"".to_string(),
            position: Some(1),
            raw: None,
        };
        assert_eq!(
            error_message(&err),
            "syntax error at or near \"SELEC\" at character 1"
        );
    }

    #[test]
    fn test_error_envelope_shape() {
        let err = DriverError::Connection("refused".to_string());
        let envelope = error_envelope(&ctx(), "SELECT 1", &err);
        assert!(envelope.error);
        assert!(envelope.cols.is_empty());
        assert!(envelope.results.is_empty());
        assert_eq!(envelope.messages.len(), 1);
        assert_eq!(envelope.request_id.as_deref(), Some("req-1"));
        assert!(envelope.raw_error.is_some());
    }

    #[test]
    fn test_normalize_batch_pairs_statements() {
        let statements = vec!["SELECT 1 AS a".to_string(), "UPDATE t SET a = 1".to_string()];
        let outputs = vec![
            StatementOutput {
                command: "SELECT".to_string(),
                fields: vec!["a".to_string()],
                rows: vec![vec![json!(1)]],
                row_count: Some(1),
            },
            StatementOutput {
                command: "UPDATE".to_string(),
                row_count: Some(4),
                ..Default::default()
            },
        ];
        let envelopes = normalize_batch(&ctx(), "SELECT 1 AS a; UPDATE t SET a = 1", &statements, Ok(outputs));
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].query, "SELECT 1 AS a");
        assert_eq!(envelopes[1].query, "UPDATE t SET a = 1");
        assert_ne!(envelopes[0].result_id, envelopes[1].result_id);
        assert!(envelopes[1].messages[0].message.contains("4 rows were affected"));
    }

    #[test]
    fn test_normalize_batch_collapses_arity_defect() {
        let statements = vec!["SELECT 1".to_string()];
        let outputs = vec![StatementOutput {
            command: "SELECT".to_string(),
            fields: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![json!(1)]],
            row_count: None,
        }];
        let envelopes = normalize_batch(&ctx(), "SELECT 1", &statements, Ok(outputs));
        assert_eq!(envelopes.len(), 1);
        assert!(envelopes[0].error);
    }
}
