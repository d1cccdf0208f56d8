// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Plugin registering [`MockDriver`] under the `mock` alias

use serde_json::json;
use sqlhub_driver::{DriverPlugin, DriverResult, PluginContext};

use crate::mock_driver::{MockBehavior, MockDriver, SharedCalls};

pub const MOCK_LOCATOR: &str = "builtin:mock";
pub const MOCK_ALIASES: [&str; 1] = ["mock"];

#[derive(Debug, Clone, Default)]
pub struct MockPlugin {
    behavior: MockBehavior,
    calls: SharedCalls,
}

impl MockPlugin {
    pub fn new(behavior: MockBehavior, calls: SharedCalls) -> Self {
        Self { behavior, calls }
    }
}

impl DriverPlugin for MockPlugin {
    fn name(&self) -> &str {
        "Mock Plugin"
    }

    fn locator(&self) -> &str {
        MOCK_LOCATOR
    }

    fn aliases(&self) -> &[&'static str] {
        &MOCK_ALIASES
    }

    fn register(&self, ctx: &mut PluginContext<'_>) -> DriverResult<()> {
        for alias in MOCK_ALIASES {
            ctx.drivers.register(
                alias,
                MockDriver::constructor(self.behavior.clone(), self.calls.clone()),
            );
            ctx.resources
                .insert(alias, "extension-id", json!("sqlhub.driver-mock"));
        }
        Ok(())
    }
}
