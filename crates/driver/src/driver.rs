// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Driver contract
//!
//! This module defines the async [`ConnectionDriver`] trait every backend
//! implements, so the server never needs to know which database it talks to.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::DriverResult;
use crate::model::{CompletionMap, ContextValue, ResultEnvelope, SearchableItem, TreeNode};
use crate::pagination::PaginationLimits;

/// Per-request execution options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Client-side request id, echoed in every envelope
    pub request_id: Option<String>,
    /// Fires when the client cancels the request
    pub cancel: CancellationToken,
    /// Bounds for submit/poll backends
    pub limits: PaginationLimits,
}

impl QueryOptions {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Default::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_limits(mut self, limits: PaginationLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Capability set every backend driver provides
///
/// A driver instance serves exactly one connection and owns at most one
/// connection handle at a time.
///
/// # Examples
///
/// ```rust,ignore
/// use sqlhub_driver::{ConnectionDriver, QueryOptions};
///
/// async fn run(driver: &mut dyn ConnectionDriver) {
///     for result in driver.query("SELECT 1; SELECT 2", QueryOptions::new("req-1")).await {
///         println!("{}: {:?}", result.query, result.results);
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait ConnectionDriver: Send + Sync {
    /// Id of the connection this instance serves
    fn id(&self) -> &str;

    /// Open the connection handle
    ///
    /// Idempotent: an existing handle is kept as is.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Connection` if the backend client cannot be built.
    async fn open(&mut self) -> DriverResult<()>;

    /// Release the connection handle, if any
    async fn close(&mut self) -> DriverResult<()>;

    /// Execute one or more semicolon-separated statements
    ///
    /// Returns one envelope per statement. Never fails: any error collapses
    /// into a single envelope with `error` set.
    async fn query(&mut self, text: &str, options: QueryOptions) -> Vec<ResultEnvelope>;

    /// Open the handle and run a trivial statement
    ///
    /// # Errors
    ///
    /// Propagates connection and execution errors unchanged.
    async fn test_connection(&mut self) -> DriverResult<()>;

    /// Next level of the explorer tree below `item`
    async fn get_children_for_item(
        &mut self,
        item: &TreeNode,
        parent: Option<&TreeNode>,
    ) -> DriverResult<Vec<TreeNode>>;

    /// Free-text search over tables or columns
    async fn search_items(
        &mut self,
        kind: ContextValue,
        search: &str,
        extra: &Value,
    ) -> DriverResult<Vec<SearchableItem>>;

    /// Keyword completions, loaded once per instance
    async fn get_static_completions(&mut self) -> DriverResult<Arc<CompletionMap>>;

    /// Bounds for statements the driver issues on its own behalf
    ///
    /// Covers connection tests, explorer lookups and keyword loading.
    /// Drivers without a paginated backend ignore them.
    fn set_limits(&mut self, _limits: PaginationLimits) {}
}

/// Slot holding a driver's single connection handle
#[derive(Debug)]
pub struct HandleSlot<H> {
    handle: Option<H>,
}

impl<H> Default for HandleSlot<H> {
    fn default() -> Self {
        Self { handle: None }
    }
}

impl<H: Clone> HandleSlot<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current handle, if open
    pub fn get(&self) -> Option<H> {
        self.handle.clone()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Store a freshly opened handle and return it
    pub fn set(&mut self, handle: H) -> H {
        self.handle = Some(handle.clone());
        handle
    }

    /// Take the handle out, leaving the slot empty
    pub fn take(&mut self) -> Option<H> {
        self.handle.take()
    }
}
