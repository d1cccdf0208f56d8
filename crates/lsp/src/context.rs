// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server context
//!
//! Shared state handed to every request handler and hook: the driver
//! registry, the resource map, the working configuration and the open
//! connections.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use sqlhub_driver::{
    ConnectionConfig, ConnectionDriver, DriverPlugin, DriverRegistry, PluginContext, ResourceMap,
    install_plugin,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::ServerConfig;
use crate::connection_manager::ConnectionManager;
use crate::error::ServerResult;
use crate::plugins::PluginCatalog;

pub struct ServerContext {
    drivers: RwLock<DriverRegistry>,
    resources: RwLock<ResourceMap>,
    config: RwLock<ServerConfig>,
    telemetry: AtomicBool,
    dev_mode: bool,
    connections: ConnectionManager,
    plugins: PluginCatalog,
}

impl ServerContext {
    pub fn new(plugins: PluginCatalog, dev_mode: bool) -> Self {
        Self {
            drivers: RwLock::new(DriverRegistry::new()),
            resources: RwLock::new(ResourceMap::new()),
            config: RwLock::new(ServerConfig::default()),
            telemetry: AtomicBool::new(false),
            dev_mode,
            connections: ConnectionManager::new(),
            plugins,
        }
    }

    /// Whether full request arguments are logged
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn plugins(&self) -> &PluginCatalog {
        &self.plugins
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Run a plugin's registration against the registry and resource map
    pub async fn install_plugin(&self, plugin: &dyn DriverPlugin) -> ServerResult<()> {
        let mut drivers = self.drivers.write().await;
        let mut resources = self.resources.write().await;
        let mut ctx = PluginContext::new(&mut drivers, &mut resources);
        install_plugin(plugin, &mut ctx)?;
        Ok(())
    }

    /// Snapshot of the registry
    pub async fn drivers(&self) -> DriverRegistry {
        self.drivers.read().await.clone()
    }

    pub async fn driver_aliases(&self) -> Vec<String> {
        self.drivers.read().await.aliases()
    }

    /// A driver instance not tracked by the connection manager
    pub async fn create_detached(
        &self,
        config: &ConnectionConfig,
    ) -> ServerResult<Box<dyn ConnectionDriver>> {
        Ok(self.drivers.read().await.create(config)?)
    }

    /// Published resources, for one alias or all of them
    pub async fn resources(&self, alias: Option<&str>) -> BTreeMap<String, Value> {
        let resources = self.resources.read().await;
        match alias {
            Some(alias) => resources.for_alias(alias),
            None => resources
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    pub async fn config(&self) -> ServerConfig {
        self.config.read().await.clone()
    }

    /// Replace the whole working configuration
    pub async fn set_config(&self, config: ServerConfig) {
        info!(
            max_pages = config.max_pages,
            deadline_secs = config.query_deadline_secs,
            "Configuration replaced"
        );
        *self.config.write().await = config;
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.load(Ordering::Relaxed)
    }

    pub fn set_telemetry(&self, enabled: bool) {
        self.telemetry.store(enabled, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("dev_mode", &self.dev_mode)
            .field("telemetry", &self.telemetry_enabled())
            .field("plugins", &self.plugins)
            .finish()
    }
}
