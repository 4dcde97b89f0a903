//! Schema types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column type inferred for a field
///
/// Names match the BigQuery legacy SQL column types so the value can be
/// sent to the load API as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
}

impl FieldType {
    /// Widen this type with a new observation
    ///
    /// Only `INTEGER` followed by `FLOAT` changes anything. Every other
    /// combination keeps the type that was observed first.
    pub fn widen(self, observed: FieldType) -> FieldType {
        match (self, observed) {
            (FieldType::Integer, FieldType::Float) => FieldType::Float,
            (current, _) => current,
        }
    }

    /// Column type name as used by the load API
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Boolean => "BOOLEAN",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a composite schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name as it appears in the JSON records
    pub name: String,

    /// Inferred column type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Column mode, always `NULLABLE` for sampled fields
    pub mode: String,
}

impl FieldSchema {
    /// Create a nullable field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: "NULLABLE".to_string(),
        }
    }
}

/// Ordered set of fields, in first-observed order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompositeSchema {
    fields: Vec<FieldSchema>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CompositeSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field has been observed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in first-observed order
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Look up a field's type by name
    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.index.get(name).map(|&i| self.fields[i].field_type)
    }

    /// Field names in first-observed order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub(crate) fn insert(&mut self, name: &str, field_type: FieldType) {
        self.index.insert(name.to_string(), self.fields.len());
        self.fields.push(FieldSchema::new(name, field_type));
    }

    pub(crate) fn set(&mut self, name: &str, field_type: FieldType) {
        if let Some(&i) = self.index.get(name) {
            self.fields[i].field_type = field_type;
        }
    }

    /// Render as the `schema` object of a BigQuery load configuration
    pub fn to_bigquery_json(&self) -> serde_json::Value {
        serde_json::json!({ "fields": self.fields })
    }
}

/// Counters collected while sampling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleStats {
    /// Objects taken from the listing (bounded by the file limit)
    pub files_seen: usize,
    /// Objects whose name matched the data suffix and were read
    pub files_read: usize,
    /// Lines consumed across all files, blank lines included
    pub lines_read: usize,
    /// JSON records fed to the accumulator
    pub records: usize,
}

/// Bounds on how much data schema inference reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleBudget {
    /// Maximum number of objects taken from the listing
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum number of lines read from any one object
    #[serde(default = "default_max_lines")]
    pub max_lines_per_file: usize,
}

fn default_max_files() -> usize {
    10
}

fn default_max_lines() -> usize {
    1000
}

impl Default for SampleBudget {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_lines_per_file: default_max_lines(),
        }
    }
}

impl SampleBudget {
    /// Create a budget
    pub fn new(max_files: usize, max_lines_per_file: usize) -> Self {
        Self {
            max_files,
            max_lines_per_file,
        }
    }
}
