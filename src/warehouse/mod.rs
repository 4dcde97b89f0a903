//! Source warehouse access
//!
//! The pipeline only needs two things from the warehouse: run a statement,
//! and release the session. [`Warehouse`] captures that, and
//! [`SnowflakeWarehouse`] implements it over the Snowflake SQL REST API.

mod auth;
mod snowflake;
mod statements;

pub use auth::SnowflakeCredential;
pub use snowflake::SnowflakeWarehouse;
pub use statements::{create_stage_sql, export_sql};

use crate::error::Result;
use async_trait::async_trait;

/// Outcome of a successfully executed statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementResult {
    /// Server-side statement handle
    pub handle: Option<String>,
    /// Rows in the result set, when reported
    pub rows: Option<u64>,
}

/// A connection to the source warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute one SQL statement and wait for it to finish
    async fn execute(&self, sql: &str) -> Result<StatementResult>;

    /// Release the session. Later calls to `execute` fail.
    async fn close(&self) -> Result<()>;
}
