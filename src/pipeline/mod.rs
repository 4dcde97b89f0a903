//! Pipeline module
//!
//! Runs one replace-load: stage, export, relocate, infer, load.
//!
//! # Steps
//!
//! - `create_stage` - create or replace the export stage (policy-controlled)
//! - `export` - copy the table into the stage as gzip JSON lines (policy-controlled)
//! - `relocate` - move the files to the destination bucket (always fatal)
//! - `infer_schema` - sample the moved files (always fatal)
//! - `load` - replace the destination table's contents (always fatal)

mod driver;
mod plan;

pub use driver::{Pipeline, RunReport, Step, StepOutcome};
pub use plan::Plan;
