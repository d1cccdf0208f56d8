// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Connection settings understood by the Redshift Data API driver.

use serde::{Deserialize, Serialize};

/// Region used when neither `region` nor `endpoint` is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Redshift Data API connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedshiftDataCredentials {
    pub cluster_identifier: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Overrides the regional endpoint, e.g. a signing proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl RedshiftDataCredentials {
    pub fn new(cluster_identifier: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            cluster_identifier: cluster_identifier.into(),
            database: database.into(),
            db_user: None,
            secret_arn: None,
            region: None,
            endpoint: None,
        }
    }

    /// Base URL the client posts to
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "https://redshift-data.{}.amazonaws.com",
                self.region.as_deref().unwrap_or(DEFAULT_REGION)
            ),
        }
    }
}
