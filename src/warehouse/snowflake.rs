//! Snowflake SQL API v2 client

use super::auth::SnowflakeCredential;
use super::{StatementResult, Warehouse};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::naming::RunContext;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const STATEMENTS_PATH: &str = "/api/v2/statements";

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    statement_status_url: Option<String>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    num_rows: Option<u64>,
}

/// Warehouse session backed by the Snowflake SQL REST API
///
/// The API is stateless; every statement carries the database, schema and
/// virtual warehouse it runs in.
#[derive(Debug)]
pub struct SnowflakeWarehouse {
    client: Client,
    base_url: String,
    credential: SnowflakeCredential,
    database: String,
    schema: String,
    warehouse: String,
    role: Option<String>,
    statement_timeout_secs: u64,
    poll_interval: Duration,
    closed: AtomicBool,
}

impl SnowflakeWarehouse {
    /// Resolve credentials from the environment and open a checked session
    pub async fn connect(settings: &Settings, ctx: &RunContext) -> Result<Self> {
        let credential = SnowflakeCredential::from_env(&settings.snowflake)
            .map_err(|e| Error::connection(e.to_string()))?;
        Self::connect_with(settings, ctx, credential).await
    }

    /// Open a checked session with an explicit credential
    ///
    /// Runs `SELECT 1` so that bad credentials fail here rather than at the
    /// first pipeline step.
    pub async fn connect_with(
        settings: &Settings,
        ctx: &RunContext,
        credential: SnowflakeCredential,
    ) -> Result<Self> {
        let sf = &settings.snowflake;
        let warehouse = Self {
            client: settings.http.client()?,
            base_url: sf.api_base_url().trim_end_matches('/').to_string(),
            credential,
            database: ctx.database.to_uppercase(),
            schema: ctx.schema.to_uppercase(),
            warehouse: sf.warehouse.clone(),
            role: sf.role.clone(),
            statement_timeout_secs: sf.statement_timeout_secs,
            poll_interval: settings.http.poll_interval(),
            closed: AtomicBool::new(false),
        };

        warehouse
            .execute("SELECT 1")
            .await
            .map_err(|e| Error::connection(e.to_string()))?;
        info!(
            account = %sf.account,
            warehouse = %warehouse.warehouse,
            database = %warehouse.database,
            "Connected to Snowflake"
        );
        Ok(warehouse)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        Ok(builder
            .bearer_auth(self.credential.bearer()?)
            .header(
                "X-Snowflake-Authorization-Token-Type",
                self.credential.token_type(),
            )
            .header("Accept", "application/json"))
    }

    /// Poll a running statement until it completes
    async fn wait_for(&self, status_url: &str) -> Result<StatementResponse> {
        let url = if status_url.starts_with("http") {
            status_url.to_string()
        } else {
            format!("{}{status_url}", self.base_url)
        };

        loop {
            tokio::time::sleep(self.poll_interval).await;
            let response = self.authorized(self.client.get(&url))?.send().await?;
            if response.status() != StatusCode::ACCEPTED {
                return parse_response(response).await;
            }
            debug!(url = %url, "Statement still running");
        }
    }
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    async fn execute(&self, sql: &str) -> Result<StatementResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::connection("Snowflake session is closed"));
        }

        let request = StatementRequest {
            statement: sql,
            timeout: self.statement_timeout_secs,
            database: &self.database,
            schema: &self.schema,
            warehouse: &self.warehouse,
            role: self.role.as_deref(),
        };
        debug!(statement = sql, "Submitting statement");

        let url = format!("{}{STATEMENTS_PATH}", self.base_url);
        let response = self
            .authorized(self.client.post(&url))?
            .json(&request)
            .send()
            .await?;

        let body = if response.status() == StatusCode::ACCEPTED {
            let pending: StatementResponse = response.json().await?;
            let status_url = pending
                .statement_status_url
                .or_else(|| {
                    pending
                        .statement_handle
                        .map(|h| format!("{STATEMENTS_PATH}/{h}"))
                })
                .ok_or_else(|| Error::query("", "Accepted statement has no handle"))?;
            self.wait_for(&status_url).await?
        } else {
            parse_response(response).await?
        };

        Ok(StatementResult {
            handle: body.statement_handle,
            rows: body.result_set_meta_data.and_then(|m| m.num_rows),
        })
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Closed Snowflake session");
        }
        Ok(())
    }
}

/// Map a finished response to a result or a query error
async fn parse_response(response: Response) -> Result<StatementResponse> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return Ok(serde_json::from_str(&text).unwrap_or_default());
    }

    match serde_json::from_str::<StatementResponse>(&text) {
        Ok(StatementResponse {
            code: Some(code),
            message,
            ..
        }) => Err(Error::query(code, message.unwrap_or_default())),
        _ => Err(Error::http_status(status.as_u16(), text)),
    }
}
