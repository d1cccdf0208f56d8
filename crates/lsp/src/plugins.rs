// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Plugin catalog
//!
//! Driver plugins compiled into the server, addressable by locator or name.
//! Which of them are installed at startup is decided by the `plugins`
//! setting; the rest can be installed later through `ls/RegisterPlugin`.

use std::path::PathBuf;
use std::sync::Arc;

use sqlhub_driver::DriverPlugin;
use sqlhub_driver_pg::PgPlugin;
use sqlhub_driver_redshift_data::RedshiftDataPlugin;
use futures::future::BoxFuture;
use tower_lsp::lsp_types::{InitializeParams, InitializeResult};
use tracing::warn;

use crate::context::ServerContext;
use crate::error::ServerResult;
use crate::server::InitializeHook;

#[derive(Clone, Default)]
pub struct PluginCatalog {
    plugins: Vec<Arc<dyn DriverPlugin>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of every bundled driver, with icons under `resources_root`
    pub fn builtin(resources_root: impl Into<PathBuf>) -> Self {
        let root = resources_root.into();
        Self::new()
            .with_plugin(Arc::new(RedshiftDataPlugin::new(root.clone())))
            .with_plugin(Arc::new(PgPlugin::new(root)))
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn DriverPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Look a plugin up by locator, or by name ignoring case
    pub fn find(&self, path: &str) -> Option<Arc<dyn DriverPlugin>> {
        let path = path.trim();
        self.plugins
            .iter()
            .find(|p| p.locator() == path || p.name().eq_ignore_ascii_case(path))
            .cloned()
    }

    pub fn locators(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.locator().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DriverPlugin>> {
        self.plugins.iter()
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.locators()).finish()
    }
}

/// Initialize hook installing the configured plugins
///
/// Without a `plugins` setting every catalog entry is installed. Unknown
/// locators are skipped with a warning.
pub fn bootstrap_hook() -> InitializeHook {
    Arc::new(
        |ctx: Arc<ServerContext>,
         _params: InitializeParams|
         -> BoxFuture<'static, ServerResult<InitializeResult>> {
            Box::pin(install_configured(ctx))
        },
    )
}

async fn install_configured(ctx: Arc<ServerContext>) -> ServerResult<InitializeResult> {
    let selected: Vec<Arc<dyn DriverPlugin>> = match ctx.config().await.plugins {
        Some(locators) => locators
            .iter()
            .filter_map(|locator| {
                let found = ctx.plugins().find(locator);
                if found.is_none() {
                    warn!(locator = %locator, "Unknown plugin in settings");
                }
                found
            })
            .collect(),
        None => ctx.plugins().iter().cloned().collect(),
    };
    for plugin in selected {
        ctx.install_plugin(plugin.as_ref()).await?;
    }
    Ok(InitializeResult::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_locator_or_name() {
        let catalog = PluginCatalog::builtin("/opt/sqlhub");
        assert_eq!(catalog.locators(), vec!["builtin:redshift-data", "builtin:pg"]);
        assert_eq!(catalog.find("builtin:pg").unwrap().locator(), "builtin:pg");
        let by_name = catalog.find("aws/redshift plugin").unwrap();
        assert_eq!(by_name.locator(), "builtin:redshift-data");
        assert!(catalog.find("./node_modules/driver-mysql").is_none());
    }
}
