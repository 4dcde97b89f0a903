//! Google access token lookup

use crate::config::ENV_GOOGLE_ACCESS_TOKEN;
use crate::error::{Error, Result};
use tokio::process::Command;
use tracing::debug;

/// Resolve an OAuth access token for Google APIs
///
/// Uses `GOOGLE_OAUTH_ACCESS_TOKEN` when set, otherwise asks the local
/// `gcloud` installation for one.
pub async fn google_access_token() -> Result<String> {
    if let Ok(token) = std::env::var(ENV_GOOGLE_ACCESS_TOKEN) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    debug!("Requesting access token from gcloud");
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| Error::config(format!("Failed to run gcloud: {e}")))?;

    if !output.status.success() {
        return Err(Error::config(format!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::config("gcloud returned an empty access token"));
    }
    Ok(token)
}
