// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Request router
//!
//! Maps custom request methods to handlers. Every dispatched request is
//! logged before its handler runs; the argument dump is added only in
//! development mode.
//!
//! Over the stdio transport only methods wired in [`crate::backend::build_service`]
//! reach [`Router::dispatch`]. tower-lsp answers any other method with
//! `MethodNotFound` itself, so `InvalidAction` for a missing handler is seen
//! only by in-process callers of [`crate::ProtocolServer::handle_request`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::context::ServerContext;
use crate::error::{ServerError, ServerResult};

/// Boxed request handler
pub type Handler =
    Arc<dyn Fn(Arc<ServerContext>, Value) -> BoxFuture<'static, ServerResult<Value>> + Send + Sync>;

/// Method name that would match everything; never accepted
pub const WILDCARD: &str = "*";

#[derive(Default, Clone)]
pub struct Router {
    handlers: HashMap<String, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method`, replacing any earlier one
    pub fn on_request(&mut self, method: impl Into<String>, handler: Handler) -> ServerResult<()> {
        let method = method.into();
        if method == WILDCARD {
            return Err(ServerError::invalid_action(
                "Cannot register a handler for every request",
            ));
        }
        debug!(method = %method, "Request handler registered");
        self.handlers.insert(method, handler);
        Ok(())
    }

    pub fn has_handler(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered methods, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.keys().cloned().collect();
        methods.sort();
        methods
    }

    /// Log the request and run its handler with `params` as received
    pub async fn dispatch(
        &self,
        ctx: Arc<ServerContext>,
        method: &str,
        params: Value,
    ) -> ServerResult<Value> {
        debug!("{}", describe_request(method, &params, ctx.dev_mode()));
        let Some(handler) = self.handlers.get(method) else {
            return Err(ServerError::invalid_action(format!(
                "No handler registered for '{}'",
                method
            )));
        };
        handler(ctx, params).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.methods())
            .finish()
    }
}

/// Log line for an incoming request
pub fn describe_request(method: &str, params: &Value, verbose: bool) -> String {
    if verbose {
        format!("REQUEST => {} {}", method, params)
    } else {
        format!("REQUEST => {}", method)
    }
}

/// Wrap a typed async function as a [`Handler`]
///
/// Params are decoded before the function runs and its result is encoded
/// back to JSON.
pub fn typed<P, R, F, Fut>(f: F) -> Handler
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + 'static,
    F: Fn(Arc<ServerContext>, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServerResult<R>> + Send + 'static,
{
    Arc::new(
        move |ctx: Arc<ServerContext>, params: Value| -> BoxFuture<'static, ServerResult<Value>> {
            match serde_json::from_value::<P>(params) {
                Ok(params) => {
                    let fut = f(ctx, params);
                    Box::pin(async move { Ok(serde_json::to_value(fut.await?)?) })
                }
                Err(e) => Box::pin(futures::future::ready(Err(ServerError::from(e)))),
            }
        },
    )
}
