//! Relocation of exported files between buckets

use super::location::{BucketOpener, GcsLocation};
use crate::config::RelocationMode;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, WriteMultipart};
use tokio::process::Command;
use tracing::{debug, error, info};

/// Result of a relocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationReport {
    /// Number of objects relocated, when the backend reports it
    pub objects: Option<usize>,
}

/// Moves or copies every object matching `source` under `destination`
///
/// `source` is a `gs://bucket/prefix/*` wildcard and `destination` a
/// `gs://bucket/prefix` directory.
#[async_trait]
pub trait Relocator: Send + Sync {
    /// Relocate the objects
    async fn relocate(&self, source: &str, destination: &str) -> Result<RelocationReport>;

    /// Move or copy
    fn mode(&self) -> RelocationMode;
}

// ============================================================================
// gsutil
// ============================================================================

/// Relocates by running `gsutil -m mv|cp`
#[derive(Debug, Clone)]
pub struct GsutilRelocator {
    program: String,
    mode: RelocationMode,
}

impl GsutilRelocator {
    /// Create a relocator running the given gsutil binary
    pub fn new(program: impl Into<String>, mode: RelocationMode) -> Self {
        Self {
            program: program.into(),
            mode,
        }
    }

    fn verb(&self) -> &'static str {
        match self.mode {
            RelocationMode::Move => "mv",
            RelocationMode::Copy => "cp",
        }
    }
}

#[async_trait]
impl Relocator for GsutilRelocator {
    async fn relocate(&self, source: &str, destination: &str) -> Result<RelocationReport> {
        debug!(program = %self.program, verb = self.verb(), source, destination, "Running gsutil");

        let output = Command::new(&self.program)
            .args(["-m", self.verb(), source, destination])
            .output()
            .await
            .map_err(|e| Error::relocation(format!("Failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(status = %output.status, stderr = %stderr.trim(), "gsutil failed");
            return Err(Error::Relocation {
                message: format!("{} exited with {}", self.program, output.status),
                stderr: Some(stderr),
            });
        }

        info!(source, destination, "Relocated files with gsutil");
        Ok(RelocationReport { objects: None })
    }

    fn mode(&self) -> RelocationMode {
        self.mode
    }
}

// ============================================================================
// Native
// ============================================================================

/// Upload parts allowed in flight while streaming one object
const MAX_IN_FLIGHT_PARTS: usize = 4;

/// Relocates through object store clients, one object at a time
///
/// Each object is streamed into a multipart upload, so memory use is bounded
/// by the part size rather than the object size.
pub struct ObjectStoreRelocator {
    opener: BucketOpener,
    mode: RelocationMode,
}

impl ObjectStoreRelocator {
    /// Create a relocator opening buckets with `opener`
    pub fn new(opener: BucketOpener, mode: RelocationMode) -> Self {
        Self { opener, mode }
    }
}

#[async_trait]
impl Relocator for ObjectStoreRelocator {
    async fn relocate(&self, source: &str, destination: &str) -> Result<RelocationReport> {
        let from = GcsLocation::parse(source)?;
        let to = GcsLocation::parse(destination)?;
        let source_store = (self.opener)(from.bucket())?;
        let target_store = (self.opener)(to.bucket())?;

        let from_path = from.path();
        let objects: Vec<_> = source_store
            .list(Some(&from_path))
            .try_collect()
            .await?;

        if objects.is_empty() {
            return Err(Error::relocation(format!("No URLs matched: {source}")));
        }

        let from_dir = format!("{}/", from_path.as_ref());
        let to_path = to.path();
        for meta in &objects {
            let relative = meta
                .location
                .as_ref()
                .strip_prefix(&from_dir)
                .unwrap_or(meta.location.as_ref());
            let target = if to_path.as_ref().is_empty() {
                ObjectPath::from(relative)
            } else {
                ObjectPath::from(format!("{}/{relative}", to_path.as_ref()))
            };

            transfer(source_store.as_ref(), target_store.as_ref(), &meta.location, &target).await?;
            if self.mode == RelocationMode::Move {
                source_store.delete(&meta.location).await?;
            }
            debug!(from = %meta.location, to = %target, "Relocated object");
        }

        info!(
            objects = objects.len(),
            mode = ?self.mode,
            source,
            destination,
            "Relocated files"
        );
        Ok(RelocationReport {
            objects: Some(objects.len()),
        })
    }

    fn mode(&self) -> RelocationMode {
        self.mode
    }
}

/// Stream one object from `source` into `target`
async fn transfer(
    source: &dyn ObjectStore,
    target: &dyn ObjectStore,
    from: &ObjectPath,
    to: &ObjectPath,
) -> Result<()> {
    let mut chunks = source.get(from).await?.into_stream();
    let mut writer = WriteMultipart::new(target.put_multipart(to).await?);

    loop {
        let chunk = match chunks.try_next().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                writer.abort().await?;
                return Err(e.into());
            }
        };
        writer.wait_for_capacity(MAX_IN_FLIGHT_PARTS).await?;
        writer.write(&chunk);
    }

    writer.finish().await?;
    Ok(())
}
