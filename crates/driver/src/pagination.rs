// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Paginated execution
//!
//! Adapter for submit/poll backends, where a statement is submitted once,
//! its status is polled until it settles, and the result rows arrive in pages
//! addressed by a continuation token.
//!
//! ```text
//! submit ──► describe* ──► fetch(token₀) ──► fetch(token₁) ──► ... ──► fetch(tokenₙ₋₁)
//!                                                        (no next token: done)
//! ```
//!
//! The page loop is bounded by [`PaginationLimits`] and honors a
//! [`CancellationToken`] at every await point.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DriverError, DriverResult};

/// Default maximum number of result pages per statement
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Default time budget for one statement, in seconds
pub const DEFAULT_DEADLINE_SECS: u64 = 300;

/// Default delay between status polls, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Bounds applied to a single statement execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    pub max_pages: usize,
    pub deadline: Duration,
    pub poll_interval: Duration,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Acknowledgement of a submitted statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub next_token: Option<String>,
}

/// Lifecycle state of a submitted statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementStatus {
    /// Accepted or running; poll again
    Running,
    /// Completed; rows can be fetched when `has_result_set` is set
    Finished {
        has_result_set: bool,
        rows_affected: Option<u64>,
    },
    /// Rejected by the backend
    Failed { message: String, raw: Option<Value> },
    /// Cancelled on the backend side
    Aborted,
}

/// One page of statement results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub next_token: Option<String>,
}

/// Backend exposing submit/poll statement execution
#[async_trait]
pub trait SubmitPollBackend: Send + Sync {
    /// Submit a statement for execution
    async fn submit(&self, sql: &str) -> DriverResult<Submission>;

    /// Current status of a submitted statement
    async fn describe(&self, id: &str) -> DriverResult<StatementStatus>;

    /// Fetch one page of results
    async fn fetch_page(&self, id: &str, next_token: Option<&str>) -> DriverResult<ResultPage>;
}

/// Everything a completed statement produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagedResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: Option<u64>,
    pub pages: usize,
}

/// Runs statements against a [`SubmitPollBackend`] to completion
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginatedExecutor {
    limits: PaginationLimits,
}

impl PaginatedExecutor {
    pub fn new(limits: PaginationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> PaginationLimits {
        self.limits
    }

    /// Submit `sql`, wait for it to settle and collect every result page
    pub async fn run<B>(
        &self,
        backend: &B,
        sql: &str,
        cancel: &CancellationToken,
    ) -> DriverResult<PagedResult>
    where
        B: SubmitPollBackend + ?Sized,
    {
        let started = Instant::now();
        let submission = guard(cancel, backend.submit(sql)).await?;
        debug!(id = %submission.id, "Statement submitted");

        let (has_result_set, rows_affected) = self
            .wait_until_settled(backend, &submission.id, started, cancel)
            .await?;

        let mut result = PagedResult {
            rows_affected,
            ..Default::default()
        };
        if !has_result_set {
            return Ok(result);
        }

        let mut token = submission.next_token;
        loop {
            if result.pages >= self.limits.max_pages {
                warn!(id = %submission.id, pages = result.pages, "Page limit reached");
                return Err(DriverError::Pagination {
                    page: result.pages + 1,
                    reason: format!("exceeded the limit of {} pages", self.limits.max_pages),
                });
            }
            self.check_deadline(started, result.pages + 1)?;

            let page_no = result.pages + 1;
            let page = guard(cancel, backend.fetch_page(&submission.id, token.as_deref()))
                .await
                .map_err(|e| match e {
                    DriverError::Cancelled => DriverError::Cancelled,
                    other => DriverError::Pagination {
                        page: page_no,
                        reason: other.to_string(),
                    },
                })?;
            result.pages = page_no;

            if result.columns.is_empty() {
                result.columns = page.columns;
            }
            result.rows.extend(page.rows);

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(
            id = %submission.id,
            pages = result.pages,
            rows = result.rows.len(),
            "Statement results collected"
        );
        Ok(result)
    }

    async fn wait_until_settled<B>(
        &self,
        backend: &B,
        id: &str,
        started: Instant,
        cancel: &CancellationToken,
    ) -> DriverResult<(bool, Option<u64>)>
    where
        B: SubmitPollBackend + ?Sized,
    {
        loop {
            match guard(cancel, backend.describe(id)).await? {
                StatementStatus::Finished {
                    has_result_set,
                    rows_affected,
                } => return Ok((has_result_set, rows_affected)),
                StatementStatus::Failed { message, raw } => {
                    return Err(DriverError::Execution {
                        message,
                        position: None,
                        raw,
                    });
                }
                StatementStatus::Aborted => {
                    return Err(DriverError::execution(format!(
                        "Statement {} was aborted",
                        id
                    )));
                }
                StatementStatus::Running => {
                    self.check_deadline(started, 0)?;
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(DriverError::Cancelled),
                        _ = tokio::time::sleep(self.limits.poll_interval) => {}
                    }
                }
            }
        }
    }

    fn check_deadline(&self, started: Instant, page: usize) -> DriverResult<()> {
        if started.elapsed() > self.limits.deadline {
            return Err(DriverError::Pagination {
                page,
                reason: format!(
                    "exceeded the deadline of {}s",
                    self.limits.deadline.as_secs()
                ),
            });
        }
        Ok(())
    }
}

/// Race a backend call against cancellation
async fn guard<T>(
    cancel: &CancellationToken,
    call: impl std::future::Future<Output = DriverResult<T>>,
) -> DriverResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DriverError::Cancelled),
        result = call => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `pages` in order, chaining tokens t1..t(n-1)
    struct PagedBackend {
        pages: Vec<Vec<Vec<Value>>>,
        fetch_calls: AtomicUsize,
        tokens_seen: Mutex<Vec<Option<String>>>,
        running_polls: AtomicUsize,
        endless: bool,
    }

    impl PagedBackend {
        fn new(pages: Vec<Vec<Vec<Value>>>) -> Self {
            Self {
                pages,
                fetch_calls: AtomicUsize::new(0),
                tokens_seen: Mutex::new(Vec::new()),
                running_polls: AtomicUsize::new(0),
                endless: false,
            }
        }
    }

    #[async_trait]
    impl SubmitPollBackend for PagedBackend {
        async fn submit(&self, _sql: &str) -> DriverResult<Submission> {
            Ok(Submission {
                id: "exec-1".to_string(),
                next_token: None,
            })
        }

        async fn describe(&self, _id: &str) -> DriverResult<StatementStatus> {
            if self.running_polls.load(Ordering::SeqCst) > 0 {
                self.running_polls.fetch_sub(1, Ordering::SeqCst);
                return Ok(StatementStatus::Running);
            }
            Ok(StatementStatus::Finished {
                has_result_set: true,
                rows_affected: None,
            })
        }

        async fn fetch_page(&self, _id: &str, next_token: Option<&str>) -> DriverResult<ResultPage> {
            let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.tokens_seen
                .lock()
                .unwrap()
                .push(next_token.map(str::to_string));
            if self.endless {
                return Ok(ResultPage {
                    columns: vec!["n".to_string()],
                    rows: vec![vec![json!(call)]],
                    next_token: Some(format!("t{}", call + 1)),
                });
            }
            let next = if call + 1 < self.pages.len() {
                Some(format!("t{}", call + 1))
            } else {
                None
            };
            Ok(ResultPage {
                columns: vec!["n".to_string()],
                rows: self.pages[call].clone(),
                next_token: next,
            })
        }
    }

    #[tokio::test]
    async fn test_fetches_exactly_n_pages_in_order() {
        let backend = PagedBackend::new(vec![
            vec![vec![json!(1)], vec![json!(2)]],
            vec![vec![json!(3)]],
            vec![vec![json!(4)], vec![json!(5)]],
        ]);
        let executor = PaginatedExecutor::default();
        let result = executor
            .run(&backend, "SELECT n FROM t", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.pages, 3);
        assert_eq!(result.columns, vec!["n"]);
        let values: Vec<Value> = result.rows.into_iter().map(|mut r| r.remove(0)).collect();
        assert_eq!(values, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);

        let tokens = backend.tokens_seen.lock().unwrap().clone();
        assert_eq!(
            tokens,
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_single_page_without_token() {
        let backend = PagedBackend::new(vec![vec![vec![json!(1)]]]);
        let result = PaginatedExecutor::default()
            .run(&backend, "SELECT 1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_page_limit_is_enforced() {
        let mut backend = PagedBackend::new(Vec::new());
        backend.endless = true;
        let executor = PaginatedExecutor::new(PaginationLimits {
            max_pages: 3,
            ..Default::default()
        });
        let err = executor
            .run(&backend, "SELECT n FROM t", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Pagination { page: 4, .. }));
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_finished() {
        let backend = PagedBackend::new(vec![vec![vec![json!(1)]]]);
        backend.running_polls.store(2, Ordering::SeqCst);
        let result = PaginatedExecutor::default()
            .run(&backend, "SELECT 1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(backend.running_polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_while_running() {
        let backend = PagedBackend::new(vec![vec![vec![json!(1)]]]);
        backend.running_polls.store(usize::MAX, Ordering::SeqCst);
        let executor = PaginatedExecutor::new(PaginationLimits {
            deadline: Duration::from_secs(1),
            poll_interval: Duration::from_millis(400),
            ..Default::default()
        });
        let err = executor
            .run(&backend, "SELECT 1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Pagination { .. }));
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_submit() {
        let backend = PagedBackend::new(vec![vec![vec![json!(1)]]]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = PaginatedExecutor::default()
            .run(&backend, "SELECT 1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Cancelled));
    }
}
