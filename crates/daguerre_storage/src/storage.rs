//! Storage trait definition.

use bytes::Bytes;
use daguerre_core::AssetLocation;
use daguerre_error::StorageError;

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What a `put` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PutOutcome {
    /// The object was written
    #[display("created")]
    Created,
    /// An object already existed at the path and was left untouched
    #[display("already_exists")]
    AlreadyExists,
}

/// Trait for pluggable asset storage backends.
///
/// Implementations never retry; transient failures surface as
/// [`StorageError`] for the caller's operational layer to handle. Dropping a
/// returned future abandons the operation without leaving a partial object.
#[async_trait::async_trait]
pub trait AssetStorage: Send + Sync {
    /// Fetch the complete object at `location`.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing is stored there; read errors otherwise.
    /// Never returns truncated data.
    async fn get(&self, location: &AssetLocation) -> StorageResult<Bytes>;

    /// Store `content` at `location` unless an object is already there.
    ///
    /// An existing object is never overwritten and is not an error.
    async fn put(&self, location: &AssetLocation, content: Bytes) -> StorageResult<PutOutcome>;

    /// Short backend name for logs (e.g., "filesystem", "s3").
    fn backend_name(&self) -> &'static str;
}
