//! On-read image transforms for Daguerre.
//!
//! Two halves:
//!
//! - [`TransformRequest`] validates user-supplied geometry, quality, format
//!   and crop parameters before anything touches storage.
//! - [`ImageEngine`] turns stored bytes into the requested rendition;
//!   [`RasterEngine`] is the implementation on top of the `image` crate.
//!
//! # Example
//!
//! ```rust
//! use daguerre_transform::{CropStrategy, OutputFormat, TransformRequest};
//!
//! let request = TransformRequest::parse([("size", "120x240"), ("crop", "entropy")])?;
//! assert_eq!(*request.crop(), CropStrategy::Entropy);
//! assert!(request.output_format(Some(OutputFormat::Png)) == Some(OutputFormat::Png));
//! # Ok::<(), daguerre_transform::ValidationError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod raster;
mod request;

pub use daguerre_error::{ImageError, ImageErrorKind, ValidationError, ValidationErrorKind};
pub use engine::{EngineStats, ImageEngine, Operation, ResizeSpec};
pub use raster::{RasterEngine, RasterImage};
pub use request::{
    CropStrategy, MAX_HEIGHT, MAX_QUALITY, MAX_WIDTH, OutputFormat, TransformRequest,
};
