//! Schema inference module
//!
//! Infers a flat column schema from a sample of exported JSON lines files.
//!
//! # Features
//!
//! - **Type Classification**: Maps each JSON value to a column type
//! - **Accumulation**: Merges observations across records and files
//! - **Integer Widening**: `INTEGER` becomes `FLOAT` on conflicting evidence
//! - **Bounded Sampling**: Caps files and lines per file read from storage

mod inference;
mod sampler;
mod types;

pub use inference::{classify, SchemaAccumulator};
pub use sampler::{SampleReader, DEFAULT_DATA_SUFFIX};
pub use types::{CompositeSchema, FieldSchema, FieldType, SampleBudget, SampleStats};

#[cfg(test)]
mod tests;
