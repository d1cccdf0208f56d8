// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Driver registry and plugin surface
//!
//! Plugins add driver constructors under one or more aliases and publish
//! resource descriptors (icons, connection schemas) for the editor.
//! Registration is additive: a plugin only ever touches its own aliases.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::driver::ConnectionDriver;
use crate::error::{DriverError, DriverResult};
use crate::model::ConnectionConfig;

/// Builds a fresh driver instance for one connection
pub type DriverConstructor =
    Arc<dyn Fn(ConnectionConfig) -> DriverResult<Box<dyn ConnectionDriver>> + Send + Sync>;

/// Resource kinds a plugin may publish per alias
pub const RESOURCE_KINDS: [&str; 4] = ["icons", "extension-id", "connection-schema", "ui-schema"];

/// Alias to constructor mapping
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, DriverConstructor>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("aliases", &self.aliases())
            .finish()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `alias`, replacing only that alias
    pub fn register(&mut self, alias: impl Into<String>, constructor: DriverConstructor) {
        let alias = alias.into();
        if self.drivers.insert(alias.clone(), constructor).is_some() {
            debug!(alias = %alias, "Driver alias overwritten");
        } else {
            debug!(alias = %alias, "Driver alias registered");
        }
    }

    /// Constructor registered under `alias`
    pub fn resolve(&self, alias: &str) -> Option<DriverConstructor> {
        self.drivers.get(alias).cloned()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.drivers.contains_key(alias)
    }

    /// Registered aliases, sorted
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.drivers.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Instantiate the driver named by `config.driver`
    ///
    /// # Errors
    ///
    /// Returns `DriverError::UnknownDriver` if no plugin registered the alias.
    pub fn create(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn ConnectionDriver>> {
        let constructor = self
            .resolve(&config.driver)
            .ok_or_else(|| DriverError::UnknownDriver(config.driver.clone()))?;
        constructor(config.clone())
    }
}

/// Resource descriptors published by plugins
///
/// Keys follow `driver/<alias>/<kind>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMap {
    entries: BTreeMap<String, Value>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(alias: &str, kind: &str) -> String {
        format!("driver/{}/{}", alias, kind)
    }

    pub fn insert(&mut self, alias: &str, kind: &str, value: Value) {
        self.entries.insert(Self::key(alias, kind), value);
    }

    pub fn get(&self, alias: &str, kind: &str) -> Option<&Value> {
        self.entries.get(&Self::key(alias, kind))
    }

    /// Every resource of `alias`, keyed by kind
    pub fn for_alias(&self, alias: &str) -> BTreeMap<String, Value> {
        let prefix = format!("driver/{}/", alias);
        self.entries
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|kind| (kind.to_string(), v.clone())))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable view of the server handed to a plugin while it registers
pub struct PluginContext<'a> {
    pub drivers: &'a mut DriverRegistry,
    pub resources: &'a mut ResourceMap,
}

impl<'a> PluginContext<'a> {
    pub fn new(drivers: &'a mut DriverRegistry, resources: &'a mut ResourceMap) -> Self {
        Self { drivers, resources }
    }
}

/// A loadable bundle of drivers
pub trait DriverPlugin: Send + Sync {
    /// Human-readable plugin name
    fn name(&self) -> &str;

    /// Locator clients use to request this plugin
    fn locator(&self) -> &str;

    /// Aliases this plugin registers
    fn aliases(&self) -> &[&'static str];

    /// Add this plugin's drivers and resources
    fn register(&self, ctx: &mut PluginContext<'_>) -> DriverResult<()>;
}

/// Register `plugin` and log what it added
pub fn install_plugin(plugin: &dyn DriverPlugin, ctx: &mut PluginContext<'_>) -> DriverResult<()> {
    plugin.register(ctx)?;
    info!(plugin = plugin.name(), aliases = ?plugin.aliases(), "Plugin registered");
    Ok(())
}
