//! Error types for the Daguerre media store.
//!
//! This crate provides the error types shared by every Daguerre crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! The umbrella [`DaguerreError`] converts from each of them, so `?` works
//! across crate boundaries.
//!
//! # Examples
//!
//! ```
//! use daguerre_error::{AssetError, AssetErrorKind, DaguerreResult};
//!
//! fn lookup(id: &str) -> DaguerreResult<()> {
//!     Err(AssetError::new(AssetErrorKind::InvalidIdentifier(id.to_string())))?
//! }
//!
//! let err = lookup("123").unwrap_err();
//! assert_eq!(err.public_message(), "Invalid id");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod asset;
mod config;
mod error;
mod image;
mod storage;
mod validation;

pub use asset::{AssetError, AssetErrorKind};
pub use config::ConfigError;
pub use error::{DaguerreError, DaguerreErrorKind, DaguerreResult};
pub use image::{ImageError, ImageErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use validation::{ValidationError, ValidationErrorKind};
