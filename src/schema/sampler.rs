//! Schema inference over a bounded sample of gzip-compressed JSON lines files

use super::inference::SchemaAccumulator;
use super::types::{CompositeSchema, SampleBudget, SampleStats};
use crate::error::{Error, Result};
use flate2::write::MultiGzDecoder;
use futures::StreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

/// Default suffix of the files written by the warehouse export
pub const DEFAULT_DATA_SUFFIX: &str = ".json.gz";

/// Reads a bounded sample of exported files and infers their schema
#[derive(Debug, Clone)]
pub struct SampleReader {
    store: Arc<dyn ObjectStore>,
    budget: SampleBudget,
    suffix: String,
}

impl SampleReader {
    /// Create a reader over the given store
    pub fn new(store: Arc<dyn ObjectStore>, budget: SampleBudget) -> Self {
        Self {
            store,
            budget,
            suffix: DEFAULT_DATA_SUFFIX.to_string(),
        }
    }

    /// Only read objects whose name ends with this suffix
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Infer a composite schema from the objects under `prefix`
    ///
    /// Objects are visited in listing order. Every listed object counts
    /// toward the file limit, including ones skipped for a non-matching name.
    pub async fn infer(&self, prefix: &str) -> Result<(CompositeSchema, SampleStats)> {
        let prefix_path = ObjectPath::from(prefix);
        let mut listing = self.store.list(Some(&prefix_path));
        let mut accumulator = SchemaAccumulator::new();
        let mut stats = SampleStats::default();

        while stats.files_seen < self.budget.max_files {
            let Some(meta) = listing.next().await else {
                break;
            };
            let meta = meta?;
            stats.files_seen += 1;

            if !meta.location.as_ref().ends_with(&self.suffix) {
                debug!(path = %meta.location, "Skipping object without data suffix");
                continue;
            }

            stats.files_read += 1;
            self.read_object(&meta.location, &mut accumulator, &mut stats)
                .await?;
        }

        if stats.files_seen == 0 {
            return Err(Error::EmptySample {
                prefix: prefix.to_string(),
            });
        }

        let schema = accumulator.finish();
        if schema.is_empty() {
            return Err(Error::NoFieldsObserved {
                prefix: prefix.to_string(),
                files: stats.files_seen,
            });
        }

        info!(
            fields = schema.len(),
            files_seen = stats.files_seen,
            files_read = stats.files_read,
            lines = stats.lines_read,
            "Inferred schema from sample"
        );

        Ok((schema, stats))
    }

    /// Stream one object through the decompressor, stopping at the line limit
    async fn read_object(
        &self,
        location: &ObjectPath,
        accumulator: &mut SchemaAccumulator,
        stats: &mut SampleStats,
    ) -> Result<()> {
        let mut cursor = LineCursor::new(location.to_string(), self.budget.max_lines_per_file);
        let mut chunks = self.store.get(location).await?.into_stream();
        // Concatenated gzip members decode as one stream
        let mut decoder = MultiGzDecoder::new(Vec::new());
        let mut received = 0usize;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            received += chunk.len();
            decoder
                .write_all(&chunk)
                .map_err(|e| cursor.error(format!("gzip: {e}")))?;
            if cursor.drain(decoder.get_mut(), accumulator)? {
                break;
            }
        }

        // A zero-byte object has no gzip header to validate.
        if received > 0 && !cursor.exhausted() {
            decoder
                .try_finish()
                .map_err(|e| cursor.error(format!("gzip: {e}")))?;
            let buf = decoder.get_mut();
            if !cursor.drain(buf, accumulator)? && !buf.is_empty() {
                let tail = std::mem::take(buf);
                cursor.consume(&tail, accumulator)?;
            }
        }

        debug!(
            path = %location,
            lines = cursor.lines,
            records = cursor.records,
            "Sampled object"
        );
        stats.lines_read += cursor.lines;
        stats.records += cursor.records;
        Ok(())
    }
}

/// Line accounting for one object
struct LineCursor {
    path: String,
    limit: usize,
    lines: usize,
    records: usize,
}

impl LineCursor {
    fn new(path: String, limit: usize) -> Self {
        Self {
            path,
            limit,
            lines: 0,
            records: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.lines >= self.limit
    }

    fn error(&self, message: String) -> Error {
        Error::Decode {
            path: self.path.clone(),
            line: self.lines + 1,
            message,
        }
    }

    /// Consume every complete line in `buf`. Returns true once the limit is hit.
    fn drain(&mut self, buf: &mut Vec<u8>, accumulator: &mut SchemaAccumulator) -> Result<bool> {
        let mut start = 0;
        while !self.exhausted() {
            let Some(offset) = buf[start..].iter().position(|&b| b == b'\n') else {
                break;
            };
            let end = start + offset;
            self.consume(&buf[start..end], accumulator)?;
            start = end + 1;
        }
        buf.drain(..start);
        Ok(self.exhausted())
    }

    fn consume(&mut self, raw: &[u8], accumulator: &mut SchemaAccumulator) -> Result<()> {
        let text = std::str::from_utf8(raw).map_err(|e| self.error(format!("utf-8: {e}")))?;
        self.lines += 1;

        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let record: serde_json::Value = serde_json::from_str(text).map_err(|e| Error::Decode {
            path: self.path.clone(),
            line: self.lines,
            message: e.to_string(),
        })?;
        if accumulator.observe_record(&record) {
            self.records += 1;
        }
        Ok(())
    }
}
