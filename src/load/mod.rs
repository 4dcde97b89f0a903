//! Destination table loading
//!
//! [`TableLoader`] submits a load of newline-delimited JSON files into a
//! destination table with an explicit schema, and waits for it to finish.
//! [`BigQueryLoader`] implements it over the BigQuery jobs API.

mod bigquery;
mod token;

pub use bigquery::BigQueryLoader;
pub use token::google_access_token;

use crate::error::Result;
use crate::schema::CompositeSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What happens to rows already in the destination table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteDisposition {
    /// Replace all existing rows
    #[default]
    #[serde(rename = "WRITE_TRUNCATE")]
    Truncate,
}

/// A load of one URI pattern into one table
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Source URI, may end in a `*` wildcard
    pub source_uri: String,
    pub project: String,
    pub dataset: String,
    pub table: String,
    /// Explicit schema; autodetection is never used
    pub schema: CompositeSchema,
    pub write_disposition: WriteDisposition,
}

impl LoadRequest {
    /// `dataset:table` label used in logs
    pub fn destination(&self) -> String {
        format!("{}:{}.{}", self.project, self.dataset, self.table)
    }
}

/// Result of a completed load job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub job_id: String,
    /// Rows written to the destination table
    pub output_rows: u64,
}

/// Loads files into the destination warehouse
#[async_trait]
pub trait TableLoader: Send + Sync {
    /// Submit the load and wait for it to complete
    async fn load(&self, request: &LoadRequest) -> Result<LoadOutcome>;
}
