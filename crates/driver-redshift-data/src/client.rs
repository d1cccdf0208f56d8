// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Redshift Data API client
//!
//! Speaks the Data API's JSON 1.1 protocol: every operation is a POST to the
//! service endpoint with the operation named in `X-Amz-Target`.
//!
//! | Operation            | Used for                         |
//! |----------------------|----------------------------------|
//! | `ExecuteStatement`   | [`SubmitPollBackend::submit`]     |
//! | `DescribeStatement`  | [`SubmitPollBackend::describe`]   |
//! | `GetStatementResult` | [`SubmitPollBackend::fetch_page`] |
//!
//! Requests are not signed here; point `endpoint` at a signing proxy when
//! talking to AWS directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlhub_driver::{
    DriverError, DriverResult, ResultPage, StatementStatus, Submission, SubmitPollBackend,
};
use tracing::{debug, warn};

use crate::credentials::RedshiftDataCredentials;

const TARGET_PREFIX: &str = "RedshiftData";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds statement API handles from credentials
#[async_trait]
pub trait DataApiConnector: Send + Sync {
    /// Create a client for `credentials`
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Connection` if the client cannot be built.
    async fn connect(
        &self,
        credentials: &RedshiftDataCredentials,
    ) -> DriverResult<Arc<dyn SubmitPollBackend>>;
}

/// Connector producing [`HttpDataApiClient`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

#[async_trait]
impl DataApiConnector for HttpConnector {
    async fn connect(
        &self,
        credentials: &RedshiftDataCredentials,
    ) -> DriverResult<Arc<dyn SubmitPollBackend>> {
        Ok(Arc::new(HttpDataApiClient::new(credentials.clone())?))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecuteStatementRequest<'a> {
    cluster_identifier: &'a str,
    database: &'a str,
    sql: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_arn: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecuteStatementResponse {
    id: String,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStatementResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    has_result_set: bool,
    #[serde(default)]
    result_rows: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ColumnMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetStatementResultResponse {
    #[serde(default)]
    column_metadata: Vec<ColumnMetadata>,
    #[serde(default)]
    records: Vec<Vec<Field>>,
    #[serde(default)]
    next_token: Option<String>,
}

/// One typed cell of a Data API record
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Field {
    #[serde(default)]
    is_null: Option<bool>,
    boolean_value: Option<bool>,
    long_value: Option<i64>,
    double_value: Option<f64>,
    string_value: Option<String>,
    blob_value: Option<String>,
}

impl Field {
    fn into_value(self) -> Value {
        if self.is_null == Some(true) {
            return Value::Null;
        }
        if let Some(b) = self.boolean_value {
            return Value::Bool(b);
        }
        if let Some(n) = self.long_value {
            return json!(n);
        }
        if let Some(f) = self.double_value {
            return json!(f);
        }
        self.string_value
            .or(self.blob_value)
            .map(Value::String)
            .unwrap_or(Value::Null)
    }
}

/// HTTP client for one cluster and database
#[derive(Debug, Clone)]
pub struct HttpDataApiClient {
    http: Client,
    endpoint: String,
    credentials: RedshiftDataCredentials,
}

impl HttpDataApiClient {
    pub fn new(credentials: RedshiftDataCredentials) -> DriverResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DriverError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: credentials.endpoint_url(),
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> DriverResult<(Resp, Value)>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        debug!(operation, endpoint = %self.endpoint, "Data API call");
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .json(body)
            .send()
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DriverError::Connection(format!("{}: {}", operation, e)))?;
        let parsed = serde_json::from_str::<Value>(&body);

        if !status.is_success() {
            warn!(operation, %status, "Data API call rejected");
            let (message, raw) = match parsed {
                Ok(payload) => (service_error_message(&payload, status.as_str()), payload),
                Err(_) => (
                    format!("{} failed with status {}: {}", operation, status, body.trim()),
                    json!({ "status": status.as_u16(), "body": body }),
                ),
            };
            return Err(DriverError::Execution {
                message,
                position: None,
                raw: Some(raw),
            });
        }

        let payload = parsed.map_err(|e| {
            DriverError::execution(format!("Malformed {} response: {}", operation, e))
        })?;
        let decoded = serde_json::from_value(payload.clone()).map_err(|e| {
            DriverError::execution(format!("Malformed {} response: {}", operation, e))
        })?;
        Ok((decoded, payload))
    }
}

/// Error text from a JSON 1.1 error body
fn service_error_message(payload: &Value, status: &str) -> String {
    ["message", "Message"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .or_else(|| payload.get("__type").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Data API request failed with status {}", status))
}

fn status_from(response: DescribeStatementResponse, raw: Value) -> StatementStatus {
    match response.status.as_str() {
        "FINISHED" => StatementStatus::Finished {
            has_result_set: response.has_result_set,
            rows_affected: response.result_rows.and_then(|n| u64::try_from(n).ok()),
        },
        "FAILED" => StatementStatus::Failed {
            message: response
                .error
                .unwrap_or_else(|| "Statement failed".to_string()),
            raw: Some(raw),
        },
        "ABORTED" => StatementStatus::Aborted,
        _ => StatementStatus::Running,
    }
}

#[async_trait]
impl SubmitPollBackend for HttpDataApiClient {
    async fn submit(&self, sql: &str) -> DriverResult<Submission> {
        let request = ExecuteStatementRequest {
            cluster_identifier: &self.credentials.cluster_identifier,
            database: &self.credentials.database,
            sql,
            db_user: self.credentials.db_user.as_deref(),
            secret_arn: self.credentials.secret_arn.as_deref(),
        };
        let (response, _): (ExecuteStatementResponse, _) =
            self.call("ExecuteStatement", &request).await?;
        Ok(Submission {
            id: response.id,
            next_token: response.next_token,
        })
    }

    async fn describe(&self, id: &str) -> DriverResult<StatementStatus> {
        let (response, raw) = self
            .call::<_, DescribeStatementResponse>("DescribeStatement", &json!({ "Id": id }))
            .await?;
        Ok(status_from(response, raw))
    }

    async fn fetch_page(&self, id: &str, next_token: Option<&str>) -> DriverResult<ResultPage> {
        let mut request = json!({ "Id": id });
        if let Some(token) = next_token {
            request["NextToken"] = json!(token);
        }
        let (response, _): (GetStatementResultResponse, _) =
            self.call("GetStatementResult", &request).await?;
        Ok(ResultPage {
            columns: response.column_metadata.into_iter().map(|c| c.name).collect(),
            rows: response
                .records
                .into_iter()
                .map(|record| record.into_iter().map(Field::into_value).collect())
                .collect(),
            next_token: response.next_token,
        })
    }
}
