//! Object store gateway.
//!
//! The pipeline only needs three operations against remote storage: list the
//! keys under a prefix, read one object fully into memory, and write one
//! object. [`ObjectStore`] captures exactly that; implementations never retry,
//! so transient failures surface to the coordinator unchanged.
//!
//! - [`S3Store`]: Amazon S3 or any S3-compatible endpoint
//! - [`MemoryStore`]: in-process buckets with scripted failures

mod memory;
mod s3;

pub use memory::{MemoryStore, StoreCall};
pub use s3::S3Store;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{ImageBytes, ImageKey};

/// Read/list access to the source bucket and write access to the destination.
///
/// Implementations must be safe to share across all workers of a run.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short identifier used in log lines (e.g. "s3", "memory").
    fn name(&self) -> &str;

    /// Every addressable, non-empty object under `prefix` in the source bucket.
    ///
    /// Pagination is followed to the end before returning.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ImageKey>>;

    /// The complete body of `key` from the source bucket.
    async fn read(&self, key: &ImageKey) -> StoreResult<ImageBytes>;

    /// Store `bytes` under `key` in the destination bucket, replacing any
    /// existing object.
    async fn write(&self, key: &ImageKey, bytes: ImageBytes) -> StoreResult<()>;
}
