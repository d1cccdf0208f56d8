// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Scripted submit/poll statement API
//!
//! Serves a fixed result set split into pages, counting every call so tests
//! can assert how many round trips a driver made.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use sqlhub_driver::{
    DriverError, DriverResult, ResultPage, StatementStatus, Submission, SubmitPollBackend,
};

/// Round trips made against a [`ScriptedStatementApi`]
#[derive(Debug, Default)]
pub struct ApiCounters {
    pub submits: AtomicUsize,
    pub describes: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl ApiCounters {
    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn describes(&self) -> usize {
        self.describes.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

/// Statement API answering from a script
#[derive(Debug, Default)]
pub struct ScriptedStatementApi {
    columns: Vec<String>,
    pages: Vec<Vec<Vec<Value>>>,
    rows_affected: Option<u64>,
    running_polls: usize,
    failure: Option<(String, Option<Value>)>,
    fetch_error: Option<String>,
    pub counters: ApiCounters,
    submitted: Mutex<Vec<String>>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedStatementApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result set `columns` with the given pages of rows
    pub fn with_pages(mut self, columns: &[&str], pages: Vec<Vec<Vec<Value>>>) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.pages = pages;
        self
    }

    /// A statement without a result set affecting `rows` rows
    pub fn with_rows_affected(mut self, rows: u64) -> Self {
        self.rows_affected = Some(rows);
        self
    }

    /// Report `Running` this many times before finishing
    pub fn with_running_polls(mut self, polls: usize) -> Self {
        self.running_polls = polls;
        self
    }

    /// Fail every statement with `message`
    pub fn with_failure(mut self, message: &str, raw: Option<Value>) -> Self {
        self.failure = Some((message.to_string(), raw));
        self
    }

    /// Fail every page fetch with `message`
    pub fn with_fetch_error(mut self, message: &str) -> Self {
        self.fetch_error = Some(message.to_string());
        self
    }

    /// Statements submitted so far
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Continuation tokens passed to each fetch, in order
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn page_index(token: Option<&str>) -> usize {
        token
            .and_then(|t| t.strip_prefix('t'))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SubmitPollBackend for ScriptedStatementApi {
    async fn submit(&self, sql: &str) -> DriverResult<Submission> {
        let n = self.counters.submits.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(sql.to_string());
        }
        Ok(Submission {
            id: format!("stmt-{}", n),
            next_token: None,
        })
    }

    async fn describe(&self, _id: &str) -> DriverResult<StatementStatus> {
        let polls = self.counters.describes.fetch_add(1, Ordering::SeqCst);
        if polls < self.running_polls {
            return Ok(StatementStatus::Running);
        }
        if let Some((message, raw)) = &self.failure {
            return Ok(StatementStatus::Failed {
                message: message.clone(),
                raw: raw.clone(),
            });
        }
        Ok(StatementStatus::Finished {
            has_result_set: !self.pages.is_empty(),
            rows_affected: self.rows_affected,
        })
    }

    async fn fetch_page(&self, _id: &str, next_token: Option<&str>) -> DriverResult<ResultPage> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.push(next_token.map(str::to_string));
        }
        if let Some(message) = &self.fetch_error {
            return Err(DriverError::Connection(message.clone()));
        }

        let index = Self::page_index(next_token);
        let rows = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| format!("t{}", index + 1));
        Ok(ResultPage {
            columns: self.columns.clone(),
            rows,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_pages_chain_tokens() {
        let api = ScriptedStatementApi::new().with_pages(
            &["n"],
            vec![vec![vec![json!(1)]], vec![vec![json!(2)]]],
        );
        let first = api.fetch_page("stmt-1", None).await.unwrap();
        assert_eq!(first.next_token.as_deref(), Some("t1"));
        let second = api.fetch_page("stmt-1", Some("t1")).await.unwrap();
        assert_eq!(second.next_token, None);
        assert_eq!(second.rows, vec![vec![json!(2)]]);
        assert_eq!(api.counters.fetches(), 2);
    }
}
