//! Content-addressable storage backends for Daguerre.
//!
//! Every backend implements the two-operation [`AssetStorage`] contract:
//!
//! - **get**: the complete object at a location, or an explicit error
//! - **put**: create-if-absent; an existing object is a silent success
//!
//! Because an asset's location is derived from its content hash, an idempotent
//! `put` is all the deduplication the system needs. Two uploads of the same
//! bytes race at worst to write identical content.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use daguerre_core::Asset;
//! use daguerre_storage::{AssetStorage, FileSystemStorage, PutOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = FileSystemStorage::new("/tmp/daguerre")?;
//! let asset = Asset::from_bytes(Bytes::from_static(b"hello"));
//!
//! storage.put(asset.location(), asset.bytes().clone()).await?;
//! let again = storage.put(asset.location(), asset.bytes().clone()).await?;
//! assert_eq!(again, PutOutcome::AlreadyExists);
//!
//! let stored = storage.get(asset.location()).await?;
//! assert_eq!(stored, *asset.bytes());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod filesystem;
mod object;
mod provision;
mod storage;

pub use config::{
    FilesystemConfig, GcloudConfig, LinodeConfig, S3Config, StorageConfig, build_storage,
};
pub use daguerre_error::{StorageError, StorageErrorKind};
pub use filesystem::FileSystemStorage;
pub use object::ObjectStoreStorage;
pub use provision::{BucketProvisioner, GcsBucketProvisioner, S3BucketProvisioner};
pub use storage::{AssetStorage, PutOutcome, StorageResult};
