// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Plugin registering the Redshift Data driver and its editor resources.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};
use sqlhub_driver::{DriverPlugin, DriverResult, PluginContext};

use crate::driver::construct;

/// Aliases the driver answers to; the first one owns the icons
pub const DRIVER_ALIASES: [&str; 2] = ["RedshiftData", "redshift"];

/// Locator clients pass to `ls/RegisterPlugin`
pub const LOCATOR: &str = "builtin:redshift-data";

pub const EXTENSION_ID: &str = "sqlhub.driver-redshift-data";

#[derive(Debug, Clone, Default)]
pub struct RedshiftDataPlugin {
    resources_root: PathBuf,
}

impl RedshiftDataPlugin {
    /// Plugin whose icon paths resolve under `resources_root`
    pub fn new(resources_root: impl Into<PathBuf>) -> Self {
        Self {
            resources_root: resources_root.into(),
        }
    }

    fn icon(&self, state: &str) -> Value {
        json!(
            self.resources_root
                .join("icons")
                .join("redshiftdata")
                .join(format!("{}.png", state))
                .to_string_lossy()
        )
    }
}

/// JSON schema of the connection settings
pub fn connection_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "clusterIdentifier": { "title": "Cluster identifier", "type": "string", "minLength": 1 },
            "database": { "title": "Database", "type": "string", "minLength": 1 },
            "dbUser": { "title": "Database user", "type": "string" },
            "secretArn": { "title": "Secret ARN", "type": "string" },
            "region": { "title": "Region", "type": "string", "default": "us-east-1" },
            "endpoint": { "title": "Endpoint override", "type": "string", "format": "uri" }
        },
        "required": ["clusterIdentifier", "database"]
    })
}

/// Form layout hints for the connection settings
pub fn ui_schema() -> Value {
    json!({
        "ui:order": ["clusterIdentifier", "database", "dbUser", "secretArn", "region", "endpoint"],
        "secretArn": { "ui:help": "Leave empty to authenticate with the database user" }
    })
}

impl DriverPlugin for RedshiftDataPlugin {
    fn name(&self) -> &str {
        "AWS/Redshift Plugin"
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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlhub_driver::{DriverRegistry, ResourceMap};

    #[test]
    fn test_register_adds_every_alias() {
        let mut drivers = DriverRegistry::new();
        let mut resources = ResourceMap::new();
        let plugin = RedshiftDataPlugin::new("/opt/sqlhub");
        plugin
            .register(&mut PluginContext::new(&mut drivers, &mut resources))
            .unwrap();

        assert_eq!(drivers.aliases(), vec!["RedshiftData", "redshift"]);
        assert_eq!(
            resources.get("redshift", "extension-id"),
            Some(&json!(EXTENSION_ID))
        );
        let icons = resources.get("RedshiftData", "icons").unwrap();
        assert_eq!(
            icons["active"],
            json!("/opt/sqlhub/icons/redshiftdata/active.png")
        );
        assert!(resources.get("redshift", "icons").is_none());
        assert_eq!(resources.len(), 7);
    }
}
