// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Connection manager
//!
//! Keeps one driver instance per connection id and reuses it across
//! requests.
//!
//! Every instance sits behind its own async mutex, so requests against the
//! same connection run one at a time in arrival order while different
//! connections proceed independently. In-flight queries are tracked by
//! request id so a client can cancel them.

use std::collections::HashMap;
use std::sync::Arc;

use sqlhub_driver::normalize::error_envelope;
use sqlhub_driver::{
    ConnectionConfig, ConnectionDriver, DriverError, DriverRegistry, DriverResult,
    EnvelopeContext, QueryOptions, ResultEnvelope,
};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A driver instance shared between requests
pub type SharedDriver = Arc<Mutex<Box<dyn ConnectionDriver>>>;

#[derive(Default)]
pub struct ConnectionManager {
    /// Driver instances keyed by connection id
    drivers: RwLock<HashMap<String, SharedDriver>>,

    /// Cancellation tokens of running queries keyed by request id
    inflight: Mutex<HashMap<String, CancellationToken>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the instance for `config`, creating it through `registry` if needed
    pub async fn get_or_create(
        &self,
        registry: &DriverRegistry,
        config: &ConnectionConfig,
    ) -> DriverResult<SharedDriver> {
        let id = config.connection_id();
        if let Some(driver) = self.drivers.read().await.get(&id) {
            return Ok(driver.clone());
        }

        let mut drivers = self.drivers.write().await;
        // Another request may have created it while we waited
        if let Some(driver) = drivers.get(&id) {
            return Ok(driver.clone());
        }
        let driver: SharedDriver = Arc::new(Mutex::new(registry.create(config)?));
        drivers.insert(id.clone(), driver.clone());
        debug!(id = %id, driver = %config.driver, "Driver instance created");
        Ok(driver)
    }

    pub async fn get(&self, id: &str) -> Option<SharedDriver> {
        self.drivers.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.drivers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drivers.read().await.is_empty()
    }

    /// Open the connection, returning its id
    pub async fn connect(
        &self,
        registry: &DriverRegistry,
        config: &ConnectionConfig,
    ) -> DriverResult<String> {
        let driver = self.get_or_create(registry, config).await?;
        let mut driver = driver.lock().await;
        driver.open().await?;
        info!(id = %driver.id(), "Connection opened");
        Ok(driver.id().to_string())
    }

    /// Run `text` on the connection, waiting behind earlier requests
    ///
    /// Cancelling `options.cancel` while queued answers with a cancelled
    /// envelope without touching the driver.
    pub async fn query(
        &self,
        registry: &DriverRegistry,
        config: &ConnectionConfig,
        text: &str,
        options: QueryOptions,
    ) -> DriverResult<Vec<ResultEnvelope>> {
        let driver = self.get_or_create(registry, config).await?;
        let request_id = options.request_id.clone();
        let cancel = options.cancel.clone();
        if let Some(id) = &request_id {
            self.register(id, cancel.clone()).await;
        }

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(request_id = ?request_id, "Query cancelled while queued");
                let ctx = EnvelopeContext::new(config.connection_id(), request_id.clone());
                vec![error_envelope(&ctx, text, &DriverError::Cancelled)]
            }
            mut guard = driver.lock() => guard.query(text, options).await,
        };

        if let Some(id) = &request_id {
            self.finish(id).await;
        }
        Ok(results)
    }

    async fn register(&self, request_id: &str, token: CancellationToken) {
        let mut inflight = self.inflight.lock().await;
        if inflight.insert(request_id.to_string(), token).is_some() {
            warn!(request_id = %request_id, "Duplicate request id, previous query no longer cancellable");
        }
    }

    async fn finish(&self, request_id: &str) {
        self.inflight.lock().await.remove(request_id);
    }

    /// Cancel a running or queued query; false when the id is unknown
    pub async fn cancel(&self, request_id: &str) -> bool {
        match self.inflight.lock().await.remove(request_id) {
            Some(token) => {
                token.cancel();
                info!(request_id = %request_id, "Query cancelled");
                true
            }
            None => false,
        }
    }

    /// Close and forget one connection; false when it was never opened
    pub async fn disconnect(&self, id: &str) -> DriverResult<bool> {
        let Some(driver) = self.drivers.write().await.remove(id) else {
            return Ok(false);
        };
        driver.lock().await.close().await?;
        info!(id = %id, "Connection closed");
        Ok(true)
    }

    /// Close every connection
    ///
    /// This should be called when shutting down the server.
    pub async fn close_all(&self) {
        // Running queries hold their driver's lock until they see the cancel
        for (_, token) in self.inflight.lock().await.drain() {
            token.cancel();
        }
        let drivers: Vec<(String, SharedDriver)> = self.drivers.write().await.drain().collect();
        for (id, driver) in drivers {
            if let Err(e) = driver.lock().await.close().await {
                warn!(id = %id, "Failed to close connection: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager").finish_non_exhaustive()
    }
}
