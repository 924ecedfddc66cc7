//! Daguerre - content-addressable media store.
//!
//! Clients upload a file once; Daguerre derives a stable identity from its
//! bytes, stores it exactly once under that identity, and serves it back,
//! optionally resized, cropped, or re-encoded, on every read.
//!
//! # Features
//!
//! - **Content addressing**: the identifier is the SHA-256 of the bytes
//! - **Idempotent storage**: a second upload of the same bytes writes nothing
//! - **Sniffed types**: content type comes from the bytes, never a filename
//! - **On-read transforms**: JPEG, PNG and WebP output with focal-point crops
//! - **Pluggable backends**: local filesystem, in-memory, S3, Google Cloud
//!   Storage, Linode Object Storage
//!
//! # Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use daguerre::{AssetService, ServiceConfig, StorageConfig, TransformRequest, build_storage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = build_storage(&StorageConfig::Memory)?;
//! let service = AssetService::with_raster_engine(ServiceConfig::new(), storage);
//!
//! let upload = futures::stream::iter([Ok(Bytes::from_static(b"hello"))]);
//! let id = service.ingest(upload).await?;
//!
//! let rendition = service.read(id.as_str(), &TransformRequest::identity()).await?;
//! assert_eq!(rendition.content_type(), "text/plain; charset=utf-8");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `daguerre-error` - Error types
//! - `daguerre-core` - Asset identity, content sniffing, path sharding
//! - `daguerre-storage` - Storage contract and backends
//! - `daguerre-transform` - Transform requests and the image engine
//!
//! This crate (`daguerre`) ties them together and re-exports everything for
//! convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod observability;
mod service;
mod stats;

pub use config::{DaguerreConfig, LoggingConfig};
pub use observability::{ObservabilityConfig, init_observability, init_observability_with_config};
pub use service::{AssetService, Rendition, ServiceConfig};
pub use stats::{RuntimeStats, StatsReporter, StatsSnapshot};

pub use daguerre_core::*;
pub use daguerre_error::*;
pub use daguerre_storage::{
    AssetStorage, FileSystemStorage, FilesystemConfig, GcloudConfig, LinodeConfig,
    ObjectStoreStorage, PutOutcome, S3Config, StorageConfig, StorageResult, build_storage,
};
pub use daguerre_transform::{
    CropStrategy, EngineStats, ImageEngine, MAX_HEIGHT, MAX_QUALITY, MAX_WIDTH, Operation,
    OutputFormat, RasterEngine, RasterImage, ResizeSpec, TransformRequest,
};
