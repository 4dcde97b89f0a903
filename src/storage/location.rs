//! Bucket URLs and object store handles

use crate::config::StorageSettings;
use crate::error::{Error, Result};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use url::Url;

/// Opens a store for a bucket name
pub type BucketOpener = Arc<dyn Fn(&str) -> Result<Arc<dyn ObjectStore>> + Send + Sync>;

/// A bucket plus object prefix parsed from a storage URL
///
/// Accepts `gs://bucket/path/` and the warehouse's `gcs://bucket/path/`
/// spelling. A trailing `*` wildcard is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsLocation {
    bucket: String,
    prefix: String,
}

impl GcsLocation {
    /// Parse a storage URL
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "gs" | "gcs") {
            return Err(Error::config(format!("Unsupported storage URL: {url}")));
        }

        let bucket = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::config(format!("Missing bucket in storage URL: {url}")))?
            .to_string();

        // Work on the raw text so percent-decoding never alters the layout
        let after_bucket = url
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map_or("", |(_, path)| path);
        let prefix = after_bucket.trim_end_matches('*').to_string();

        Ok(Self { bucket, prefix })
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object prefix, as written in the URL
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix as an object store path
    pub fn path(&self) -> ObjectPath {
        ObjectPath::from(self.prefix.as_str())
    }
}

/// Open a GCS bucket using credentials from the environment
///
/// Reads `GOOGLE_SERVICE_ACCOUNT`, `GOOGLE_APPLICATION_CREDENTIALS` and the
/// other variables understood by `GoogleCloudStorageBuilder::from_env`.
pub fn open_bucket(bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let store = GoogleCloudStorageBuilder::from_env()
        .with_bucket_name(bucket)
        .build()
        .map_err(|e| Error::config(format!("Failed to create GCS client for {bucket}: {e}")))?;
    Ok(Arc::new(store))
}

/// Open a local directory as a store, creating it when missing
pub fn open_local(path: &str) -> Result<Arc<dyn ObjectStore>> {
    let path = path.strip_prefix("file://").unwrap_or(path);

    std::fs::create_dir_all(path)
        .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

    let store = LocalFileSystem::new_with_prefix(path)
        .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;
    Ok(Arc::new(store))
}

/// Opener for the configured storage
///
/// Buckets are GCS buckets unless `local_root` is set, in which case each
/// bucket is a directory under it.
pub fn bucket_opener(settings: &StorageSettings) -> BucketOpener {
    match &settings.local_root {
        Some(root) => {
            let root = root
                .strip_prefix("file://")
                .unwrap_or(root)
                .trim_end_matches('/')
                .to_string();
            Arc::new(move |bucket: &str| open_local(&format!("{root}/{bucket}")))
        }
        None => Arc::new(open_bucket),
    }
}
