//! Runtime settings
//!
//! Settings are read from an optional YAML file. Every section has defaults,
//! so an empty file (or no file at all) reproduces the production setup.
//! Secrets never live in the file; they come from environment variables.

use crate::error::{Error, Result};
use crate::schema::{SampleBudget, DEFAULT_DATA_SUFFIX};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Private key (PEM) used for Snowflake key-pair authentication
pub const ENV_SNOWFLAKE_PRIVATE_KEY_PATH: &str = "SNOWFLAKE_PRIVATE_KEY_PATH";
/// SHA-256 fingerprint of the registered public key
pub const ENV_SNOWFLAKE_PUBLIC_KEY_FP: &str = "SNOWFLAKE_PUBLIC_KEY_FP";
/// Pre-issued Snowflake OAuth token
pub const ENV_SNOWFLAKE_OAUTH_TOKEN: &str = "SNOWFLAKE_OAUTH_TOKEN";
/// Pre-issued Google access token
pub const ENV_GOOGLE_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

// ============================================================================
// Top-Level Settings
// ============================================================================

/// Complete settings loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Source warehouse
    pub snowflake: SnowflakeSettings,

    /// Destination warehouse
    pub bigquery: BigQuerySettings,

    /// Schema sampling budget
    pub sampling: SamplingSettings,

    /// File relocation between buckets
    pub relocation: RelocationSettings,

    /// Where buckets are opened
    pub storage: StorageSettings,

    /// What to do when a non-critical step fails
    pub policy: PolicySettings,

    /// HTTP client settings shared by both warehouse clients
    pub http: HttpSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read settings file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as a map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.sampling.max_files == 0 {
            return Err(Error::config("sampling.max_files must be at least 1"));
        }
        if self.sampling.max_lines_per_file == 0 {
            return Err(Error::config(
                "sampling.max_lines_per_file must be at least 1",
            ));
        }
        if self.snowflake.account.is_empty() {
            return Err(Error::config("snowflake.account must not be empty"));
        }
        if self.bigquery.dataset.is_empty() {
            return Err(Error::config("bigquery.dataset must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Snowflake
// ============================================================================

/// How the Snowflake client authenticates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnowflakeAuthMethod {
    /// Key-pair JWT signed with a local RSA key
    #[default]
    KeyPair,
    /// Pre-issued OAuth token
    Oauth,
}

/// Source warehouse settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowflakeSettings {
    /// Account identifier, e.g. `vc21971.us-central1.gcp`
    pub account: String,

    /// Virtual warehouse running the export
    pub warehouse: String,

    /// Login name. Defaults to `$USER@{user_domain}`.
    pub user: Option<String>,

    /// Domain appended to the OS user name
    pub user_domain: String,

    /// Role to run statements under
    pub role: Option<String>,

    /// Authentication method
    pub auth: SnowflakeAuthMethod,

    /// Override for the SQL API base URL (tests, private link)
    pub base_url: Option<String>,

    /// Server-side statement timeout in seconds
    pub statement_timeout_secs: u64,

    /// `MAX_FILE_SIZE` for the export, in bytes
    pub max_file_size: u64,
}

impl Default for SnowflakeSettings {
    fn default() -> Self {
        Self {
            account: "vc21971.us-central1.gcp".to_string(),
            warehouse: "PRD_QUERY_WH".to_string(),
            user: None,
            user_domain: "atd-us.com".to_string(),
            role: None,
            auth: SnowflakeAuthMethod::KeyPair,
            base_url: None,
            statement_timeout_secs: 3600,
            max_file_size: 4_900_000_000,
        }
    }
}

impl SnowflakeSettings {
    /// Resolve the login name
    pub fn login(&self) -> Result<String> {
        if let Some(user) = &self.user {
            return Ok(user.clone());
        }
        let os_user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .map_err(|_| Error::config("snowflake.user is not set and $USER is unavailable"))?;
        Ok(format!("{os_user}@{}", self.user_domain))
    }

    /// SQL API base URL
    pub fn api_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            format!("https://{}.snowflakecomputing.com", self.account)
        })
    }

    /// Account locator used in JWT claims, e.g. `VC21971`
    pub fn account_locator(&self) -> String {
        self.account
            .split('.')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }
}

// ============================================================================
// BigQuery
// ============================================================================

/// Destination warehouse settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BigQuerySettings {
    /// Project id. Defaults to `atd-cdp-{env}`.
    pub project: Option<String>,

    /// Dataset holding the destination table
    pub dataset: String,

    /// Job location, e.g. `US`
    pub location: Option<String>,

    /// Override for the API base URL (tests)
    pub base_url: Option<String>,
}

impl Default for BigQuerySettings {
    fn default() -> Self {
        Self {
            project: None,
            dataset: "eif".to_string(),
            location: None,
            base_url: None,
        }
    }
}

impl BigQuerySettings {
    /// API base URL
    pub fn api_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "https://bigquery.googleapis.com/bigquery/v2".to_string())
    }
}

// ============================================================================
// Sampling
// ============================================================================

/// Schema sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Maximum number of files opened
    pub max_files: usize,

    /// Maximum lines read per file
    pub max_lines_per_file: usize,

    /// Suffix identifying exported data files
    pub suffix: String,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        let budget = SampleBudget::default();
        Self {
            max_files: budget.max_files,
            max_lines_per_file: budget.max_lines_per_file,
            suffix: DEFAULT_DATA_SUFFIX.to_string(),
        }
    }
}

impl SamplingSettings {
    /// Budget handed to the sample reader
    pub fn budget(&self) -> SampleBudget {
        SampleBudget::new(self.max_files, self.max_lines_per_file)
    }
}

// ============================================================================
// Relocation
// ============================================================================

/// Whether relocated files are removed from the source bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RelocationMode {
    #[default]
    Move,
    Copy,
}

/// Mechanism used to relocate files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RelocatorBackend {
    /// Shell out to `gsutil -m`
    #[default]
    Gsutil,
    /// Copy through the object store client
    Native,
}

/// Relocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationSettings {
    pub mode: RelocationMode,
    pub backend: RelocatorBackend,
    /// Path to the gsutil binary
    pub gsutil_path: String,
}

impl Default for RelocationSettings {
    fn default() -> Self {
        Self {
            mode: RelocationMode::Move,
            backend: RelocatorBackend::Gsutil,
            gsutil_path: "gsutil".to_string(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Bucket storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Serve each bucket from `<local_root>/<bucket>` instead of GCS.
    /// Accepts a plain path or a `file://` URL.
    pub local_root: Option<String>,
}

// ============================================================================
// Step Policy
// ============================================================================

/// Reaction to a failed non-critical step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPolicy {
    /// Stop the pipeline
    Halt,
    /// Log a warning and continue
    Warn,
}

/// Policies for the steps that may be tolerated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Stage create-or-replace
    pub stage_creation: StepPolicy,
    /// Table export
    pub export: StepPolicy,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            stage_creation: StepPolicy::Warn,
            export: StepPolicy::Halt,
        }
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Delay between job status polls, in milliseconds
    pub poll_interval_ms: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            poll_interval_ms: 2000,
            user_agent: format!("sf2cdp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpSettings {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Build a reqwest client from these settings
    pub fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(Error::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.snowflake.account, "vc21971.us-central1.gcp");
        assert_eq!(settings.snowflake.warehouse, "PRD_QUERY_WH");
        assert_eq!(settings.snowflake.max_file_size, 4_900_000_000);
        assert_eq!(settings.bigquery.dataset, "eif");
        assert_eq!(settings.relocation.mode, RelocationMode::Move);
        assert_eq!(settings.policy.stage_creation, StepPolicy::Warn);
        assert_eq!(settings.policy.export, StepPolicy::Halt);
        assert_eq!(settings.sampling.suffix, ".json.gz");
        assert_eq!(settings.storage.local_root, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let settings = Settings::from_yaml("").unwrap();
        assert_eq!(settings.bigquery.dataset, "eif");
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r"
sampling:
  max_files: 3
relocation:
  mode: copy
  backend: native
policy:
  export: warn
storage:
  local_root: file:///var/tmp/buckets
";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.sampling.max_files, 3);
        assert_eq!(settings.sampling.max_lines_per_file, 1000);
        assert_eq!(settings.relocation.mode, RelocationMode::Copy);
        assert_eq!(settings.relocation.backend, RelocatorBackend::Native);
        assert_eq!(settings.policy.export, StepPolicy::Warn);
        assert_eq!(settings.policy.stage_creation, StepPolicy::Warn);
        assert_eq!(
            settings.storage.local_root.as_deref(),
            Some("file:///var/tmp/buckets")
        );
        assert_eq!(settings.snowflake.warehouse, "PRD_QUERY_WH");
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = Settings::from_yaml("sampling:\n  max_lines_per_file: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_lines_per_file"));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(Settings::from_yaml("policy:\n  export: ignore\n").is_err());
    }

    #[test]
    fn test_snowflake_urls() {
        let sf = SnowflakeSettings::default();
        assert_eq!(
            sf.api_base_url(),
            "https://vc21971.us-central1.gcp.snowflakecomputing.com"
        );
        assert_eq!(sf.account_locator(), "VC21971");
    }

    #[test]
    fn test_explicit_login() {
        let sf = SnowflakeSettings {
            user: Some("etl@atd-us.com".to_string()),
            ..Default::default()
        };
        assert_eq!(sf.login().unwrap(), "etl@atd-us.com");
    }

    #[test]
    fn test_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sf2cdp.yaml");
        std::fs::write(&path, "bigquery:\n  dataset: staging\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.bigquery.dataset, "staging");
    }
}
