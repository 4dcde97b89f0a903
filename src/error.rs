//! Error types for sf2cdp
//!
//! This module defines the error hierarchy for the whole pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for sf2cdp
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Warehouse Errors
    // ============================================================================
    #[error("Warehouse connection failed: {message}")]
    Connection { message: String },

    #[error("Failed to create or replace stage '{stage}': {message}")]
    StageCreation { stage: String, message: String },

    #[error("Failed to export table '{table}': {message}")]
    Export { table: String, message: String },

    #[error("Query failed ({code}): {message}")]
    Query { code: String, message: String },

    #[error("JWT generation failed: {message}")]
    Jwt { message: String },

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Failed to relocate files: {message}")]
    Relocation {
        message: String,
        stderr: Option<String>,
    },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Invalid storage URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Schema Inference Errors
    // ============================================================================
    #[error("No files found under '{prefix}'")]
    EmptySample { prefix: String },

    #[error("Sampled {files} file(s) under '{prefix}' but observed no fields")]
    NoFieldsObserved { prefix: String, files: usize },

    #[error("Failed to decode '{path}' at line {line}: {message}")]
    Decode {
        path: String,
        line: usize,
        message: String,
    },

    // ============================================================================
    // Load Errors
    // ============================================================================
    #[error("Load job failed: {message}")]
    Load { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error
    pub fn query(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a relocation error without captured process output
    pub fn relocation(message: impl Into<String>) -> Self {
        Self::Relocation {
            message: message.into(),
            stderr: None,
        }
    }

    /// Create a load error
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Whether the pipeline may continue past this error under a `warn` policy.
    ///
    /// Only stage creation and export failures are ever tolerated.
    pub fn is_tolerable(&self) -> bool {
        matches!(self, Error::StageCreation { .. } | Error::Export { .. })
    }
}

/// Result type alias for sf2cdp
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
