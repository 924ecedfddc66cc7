//! The image engine contract.

use crate::{CropStrategy, OutputFormat, TransformRequest};
use daguerre_error::ImageError;
use derive_getters::Getters;
use serde::Serialize;
use std::collections::BTreeMap;

/// Engine operations tracked in [`EngineStats::operation_counts`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Bytes to pixels
    Decode,
    /// Geometry change
    Resize,
    /// Metadata removal
    StripMetadata,
    /// Pixels to bytes
    Encode,
}

/// Target geometry for [`ImageEngine::resize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Getters)]
pub struct ResizeSpec {
    width: u32,
    height: u32,
    crop: CropStrategy,
}

impl ResizeSpec {
    /// Geometry requested by a transform.
    pub fn new(width: u32, height: u32, crop: CropStrategy) -> Self {
        Self {
            width,
            height,
            crop,
        }
    }

    /// Both dimensions given: output is exactly `width`×`height`.
    pub fn is_forced(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// No geometry requested at all.
    pub fn is_unchanged(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Box to fit or fill, with missing dimensions taken from the source.
    pub fn target_for(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        let width = if self.width == 0 { source_width } else { self.width };
        let height = if self.height == 0 { source_height } else { self.height };
        (width, height)
    }
}

impl From<&TransformRequest> for ResizeSpec {
    fn from(request: &TransformRequest) -> Self {
        Self::new(*request.width(), *request.height(), *request.crop())
    }
}

/// Point-in-time engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Getters)]
pub struct EngineStats {
    /// Bytes held by live decoded images
    mem: u64,
    /// Highest value `mem` has reached
    mem_high: u64,
    /// Decoded images not yet dropped
    live_images: u64,
    /// Decoded images ever created
    allocs: u64,
    /// Completed operations by name
    operation_counts: BTreeMap<String, u64>,
}

impl EngineStats {
    /// Assemble a snapshot.
    pub fn new(
        mem: u64,
        mem_high: u64,
        live_images: u64,
        allocs: u64,
        operation_counts: BTreeMap<String, u64>,
    ) -> Self {
        Self {
            mem,
            mem_high,
            live_images,
            allocs,
            operation_counts,
        }
    }
}

/// Decode, resize, and re-encode raster images.
///
/// Implementations are synchronous and CPU bound; callers run them on a
/// blocking thread. Every method must be safe to call concurrently.
pub trait ImageEngine: Send + Sync + 'static {
    /// Decoded image handle. Dropping it releases its memory.
    type Image: Send + 'static;

    /// Decode stored bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, ImageError>;

    /// Apply the sizing policy.
    ///
    /// Forced specs produce exactly the requested size. Otherwise missing
    /// dimensions default to the source's and the image is fitted inside the
    /// box, or scaled to cover it and cropped by the focal strategy.
    fn resize(&self, image: Self::Image, spec: &ResizeSpec) -> Result<Self::Image, ImageError>;

    /// Drop any metadata carried by the image.
    fn strip_metadata(&self, image: Self::Image) -> Self::Image;

    /// Encode to `format`. A `quality` of zero selects the encoder default.
    fn encode(
        &self,
        image: &Self::Image,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, ImageError>;

    /// Current counters.
    fn stats(&self) -> EngineStats;

    /// Full pipeline: decode, resize, strip, encode.
    fn render(
        &self,
        bytes: &[u8],
        spec: &ResizeSpec,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, ImageError> {
        let image = self.decode(bytes)?;
        let image = if spec.is_unchanged() {
            image
        } else {
            self.resize(image, spec)?
        };
        let image = self.strip_metadata(image);
        self.encode(&image, format, quality)
    }
}
