// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Plugin registering the PostgreSQL driver.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};
use sqlhub_driver::{DriverPlugin, DriverResult, PluginContext};

use crate::driver::construct;

pub const DRIVER_ALIASES: [&str; 2] = ["PostgreSQL", "pg"];

pub const LOCATOR: &str = "builtin:pg";

pub const EXTENSION_ID: &str = "sqlhub.driver-pg";

#[derive(Debug, Clone, Default)]
pub struct PgPlugin {
    resources_root: PathBuf,
}

impl PgPlugin {
    pub fn new(resources_root: impl Into<PathBuf>) -> Self {
        Self {
            resources_root: resources_root.into(),
        }
    }

    fn icon(&self, state: &str) -> Value {
        json!(
            self.resources_root
                .join("icons")
                .join("pg")
                .join(format!("{}.png", state))
                .to_string_lossy()
        )
    }
}

pub fn connection_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "server": { "title": "Server address", "type": "string", "default": "localhost" },
            "port": { "title": "Port", "type": "integer", "minimum": 1, "default": 5432 },
            "database": { "title": "Database", "type": "string", "minLength": 1 },
            "username": { "title": "Username", "type": "string", "minLength": 1 },
            "password": { "title": "Password", "type": "string" },
            "connectionTimeout": { "title": "Connection timeout (s)", "type": "integer", "minimum": 0 }
        },
        "required": ["server", "database", "username"]
    })
}

pub fn ui_schema() -> Value {
    json!({
        "ui:order": ["server", "port", "database", "username", "password", "connectionTimeout"],
        "password": { "ui:widget": "password" }
    })
}

impl DriverPlugin for PgPlugin {
    fn name(&self) -> &str {
        "PostgreSQL Plugin"
    }

    fn locator(&self) -> &str {
        LOCATOR
    }

    fn aliases(&self) -> &[&'static str] {
        &DRIVER_ALIASES
    }

    fn register(&self, ctx: &mut PluginContext<'_>) -> DriverResult<()> {
        ctx.resources.insert(
            DRIVER_ALIASES[0],
            "icons",
            json!({
                "active": self.icon("active"),
                "default": self.icon("default"),
                "inactive": self.icon("inactive"),
            }),
        );
        for alias in DRIVER_ALIASES {
            ctx.drivers.register(alias, Arc::new(construct));
            ctx.resources.insert(alias, "extension-id", json!(EXTENSION_ID));
            ctx.resources.insert(alias, "connection-schema", connection_schema());
            ctx.resources.insert(alias, "ui-schema", ui_schema());
        }
        Ok(())
    }
}
