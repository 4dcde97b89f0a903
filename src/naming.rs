//! Naming conventions for buckets, stages, paths and destination tables
//!
//! Every name is a pure function of a [`RunContext`]. The formats are shared
//! with other tools reading the same buckets and must not change.

use crate::error::{Error, Result};
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_][a-z0-9_$]*$").expect("identifier regex"));

/// Environment whose source bucket carries the `_new` suffix
const LEGACY_DEV_ENV: &str = "dev";

/// Identifies one run: which table, which environment, which day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunContext {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub environment: String,
    pub date: NaiveDate,
}

impl RunContext {
    /// Build a context dated with today's UTC date
    pub fn new(database: &str, schema: &str, table: &str, environment: &str) -> Result<Self> {
        Self::with_date(database, schema, table, environment, Utc::now().date_naive())
    }

    /// Build a context for an explicit date
    ///
    /// All names are lowercased and must be plain identifiers.
    pub fn with_date(
        database: &str,
        schema: &str,
        table: &str,
        environment: &str,
        date: NaiveDate,
    ) -> Result<Self> {
        Ok(Self {
            database: identifier("database", database)?,
            schema: identifier("schema", schema)?,
            table: identifier("table", table)?,
            environment: identifier("env", environment)?,
            date,
        })
    }

    /// Loadset date as `YYYY-MM-DD`
    pub fn loadset(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Bucket the warehouse exports into
    pub fn source_bucket(&self) -> String {
        if self.environment == LEGACY_DEV_ENV {
            format!("atd_dlk_source_{}_new", self.environment)
        } else {
            format!("atd_dlk_source_{}", self.environment)
        }
    }

    /// Bucket the exported files are moved to and loaded from
    pub fn target_bucket(&self) -> String {
        format!("atd_cdp_source_{}", self.environment)
    }

    /// Fully qualified external stage name
    pub fn stage_name(&self) -> String {
        format!("{}_inbound.inbound_file.{}", self.environment, self.table)
    }

    /// Storage integration bound to the stage
    pub fn storage_integration(&self) -> String {
        format!("{}_sf_source_gcs", self.environment)
    }

    /// Fully qualified source table
    pub fn source_table(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }

    /// Object prefix shared by both buckets, with a trailing slash
    ///
    /// Format: `{schema}/{table}/loadtype=replace/loadset={YYYY-MM-DD}/`
    pub fn loadset_prefix(&self) -> String {
        format!(
            "{}/{}/loadtype=replace/loadset={}/",
            self.schema,
            self.table,
            self.loadset()
        )
    }

    /// Stage URL in the warehouse's `gcs://` form
    pub fn stage_url(&self) -> String {
        format!("gcs://{}/{}", self.source_bucket(), self.loadset_prefix())
    }

    /// Wildcard source for relocation
    pub fn relocation_source(&self) -> String {
        format!("gs://{}/{}*", self.source_bucket(), self.loadset_prefix())
    }

    /// Relocation destination directory
    ///
    /// Ends in `/` so that a single matched object still lands inside the
    /// loadset directory under its own name.
    pub fn relocation_destination(&self) -> String {
        format!("gs://{}/{}", self.target_bucket(), self.loadset_prefix())
    }

    /// Wildcard URI handed to the load job
    pub fn load_uri(&self) -> String {
        format!("gs://{}/{}*", self.target_bucket(), self.loadset_prefix())
    }

    /// Default destination project
    pub fn default_project(&self) -> String {
        format!("atd-cdp-{}", self.environment)
    }

    /// Destination table id inside the dataset
    pub fn destination_table(&self) -> String {
        format!("{}_{}", self.schema, self.table)
    }
}

fn identifier(name: &str, value: &str) -> Result<String> {
    let lowered = value.trim().to_lowercase();
    if IDENTIFIER.is_match(&lowered) {
        Ok(lowered)
    } else {
        Err(Error::invalid_argument(
            name,
            format!("'{value}' is not a valid identifier"),
        ))
    }
}
