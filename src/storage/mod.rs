//! Storage module
//!
//! Bucket access and file relocation between buckets.
//!
//! # Overview
//!
//! - Parsing `gs://` / `gcs://` URLs into bucket and prefix
//! - Opening `object_store` handles for GCS buckets, or for local
//!   directories when a local storage root is configured
//! - Relocating exported files with `gsutil` or natively through the store

mod location;
mod relocate;

pub use location::{bucket_opener, open_bucket, open_local, BucketOpener, GcsLocation};
pub use relocate::{GsutilRelocator, ObjectStoreRelocator, RelocationReport, Relocator};
