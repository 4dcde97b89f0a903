//! BigQuery jobs API client

use super::token::google_access_token;
use super::{LoadOutcome, LoadRequest, TableLoader};
use crate::config::Settings;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatus,
    #[serde(default)]
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    #[serde(default)]
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    // int64 values arrive as JSON strings
    #[serde(default)]
    output_rows: Option<String>,
}

impl Job {
    fn is_done(&self) -> bool {
        self.status.state == "DONE"
    }

    fn output_rows(&self) -> u64 {
        self.statistics
            .as_ref()
            .and_then(|s| s.load.as_ref())
            .and_then(|l| l.output_rows.as_deref())
            .and_then(|r| r.parse().ok())
            .unwrap_or(0)
    }
}

/// Loads into BigQuery through `jobs.insert` and `jobs.get`
#[derive(Debug, Clone)]
pub struct BigQueryLoader {
    client: Client,
    base_url: String,
    token: Option<String>,
    location: Option<String>,
    poll_interval: Duration,
}

impl BigQueryLoader {
    /// Create a loader that resolves an access token when the load starts
    ///
    /// Resolving late keeps a short-lived token from expiring during a long
    /// export.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: settings.http.client()?,
            base_url: settings
                .bigquery
                .api_base_url()
                .trim_end_matches('/')
                .to_string(),
            token: None,
            location: settings.bigquery.location.clone(),
            poll_interval: settings.http.poll_interval(),
        })
    }

    /// Use a fixed access token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    async fn access_token(&self) -> Result<String> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => google_access_token().await,
        }
    }

    fn job_body(&self, request: &LoadRequest) -> Value {
        let mut reference = json!({ "projectId": request.project });
        if let Some(location) = &self.location {
            reference["location"] = json!(location);
        }

        json!({
            "jobReference": reference,
            "configuration": {
                "load": {
                    "sourceUris": [request.source_uri],
                    "destinationTable": {
                        "projectId": request.project,
                        "datasetId": request.dataset,
                        "tableId": request.table,
                    },
                    "schema": request.schema.to_bigquery_json(),
                    "sourceFormat": "NEWLINE_DELIMITED_JSON",
                    "writeDisposition": request.write_disposition,
                    "autodetect": false,
                }
            }
        })
    }

    async fn get_job(&self, token: &str, project: &str, job: &JobReference) -> Result<Job> {
        let url = format!("{}/projects/{project}/jobs/{}", self.base_url, job.job_id);
        let mut builder = self.client.get(&url).bearer_auth(token);
        if let Some(location) = job.location.as_ref().or(self.location.as_ref()) {
            builder = builder.query(&[("location", location)]);
        }
        parse_job(builder.send().await?).await
    }
}

#[async_trait]
impl TableLoader for BigQueryLoader {
    async fn load(&self, request: &LoadRequest) -> Result<LoadOutcome> {
        let url = format!("{}/projects/{}/jobs", self.base_url, request.project);
        debug!(url = %url, destination = %request.destination(), "Submitting load job");

        let token = self.access_token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&self.job_body(request))
            .send()
            .await?;
        let mut job = parse_job(response).await?;
        info!(job_id = %job.job_reference.job_id, "Load job submitted");

        while !job.is_done() {
            tokio::time::sleep(self.poll_interval).await;
            job = self
                .get_job(&token, &request.project, &job.job_reference)
                .await?;
            debug!(job_id = %job.job_reference.job_id, state = %job.status.state, "Polled load job");
        }

        if let Some(error) = &job.status.error_result {
            return Err(Error::load(format!("{}: {}", error.reason, error.message)));
        }

        Ok(LoadOutcome {
            output_rows: job.output_rows(),
            job_id: job.job_reference.job_id,
        })
    }
}

async fn parse_job(response: Response) -> Result<Job> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(text);
        return Err(Error::load(format!("HTTP {}: {message}", status.as_u16())));
    }

    Ok(serde_json::from_str(&text)?)
}
