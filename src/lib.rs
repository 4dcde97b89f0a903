// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::needless_pass_by_value)]

//! # sf2cdp
//!
//! Replace-loads one Snowflake table into a BigQuery table through GCS.
//!
//! ## Flow
//!
//! ```text
//! Snowflake ──COPY INTO @stage──▶ gs://atd_dlk_source_{env}/…/loadset={date}/
//!                                   │  gsutil -m mv (or native copy)
//!                                   ▼
//!                         gs://atd_cdp_source_{env}/…/loadset={date}/
//!                                   │  sample N files × M lines → schema
//!                                   ▼
//!                BigQuery load job (explicit schema, WRITE_TRUNCATE)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sf2cdp::schema::{SampleBudget, SampleReader};
//!
//! let reader = SampleReader::new(store, SampleBudget::new(10, 1000));
//! let (schema, stats) = reader.infer("orders/lines/loadtype=replace/loadset=2024-01-05/").await?;
//! for field in schema.fields() {
//!     println!("{} {}", field.name, field.field_type);
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Runtime settings
pub mod config;

/// Bucket, stage and table naming conventions
pub mod naming;

/// Schema inference from sampled JSON lines files
pub mod schema;

/// Bucket access and file relocation
pub mod storage;

/// Source warehouse (Snowflake)
pub mod warehouse;

/// Destination warehouse loading (BigQuery)
pub mod load;

/// Step sequencing and failure policy
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use naming::RunContext;
pub use pipeline::{Pipeline, Plan, RunReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
