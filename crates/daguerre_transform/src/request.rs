//! Transform request parsing and validation.

use daguerre_error::{ValidationError, ValidationErrorKind};
use derive_getters::Getters;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Largest accepted output width.
pub const MAX_WIDTH: u32 = 5000;
/// Largest accepted output height.
pub const MAX_HEIGHT: u32 = 5000;
/// Largest accepted encoder quality.
pub const MAX_QUALITY: u32 = 100;

static SIZE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)x(\d+)$").expect("Valid size regex"));
static SIZE_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)$").expect("Valid size regex"));

/// Focal-point strategy used when a resize has to drop pixels.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CropStrategy {
    /// Fit inside the requested box without cropping
    #[default]
    None,
    /// Keep the centre
    Centre,
    /// Keep the window with the most luminance detail
    Entropy,
    /// Keep the window with the strongest edges
    Attention,
    /// Keep the top or left edge
    Low,
    /// Keep the bottom or right edge
    High,
    /// Fit inside the requested box, like `none`
    All,
}

impl CropStrategy {
    /// Whether this strategy crops to fill the box rather than fitting inside it.
    pub fn crops(&self) -> bool {
        !matches!(self, Self::None | Self::All)
    }
}

/// Output encodings the engine can produce.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG
    Jpeg,
    /// PNG
    Png,
    /// WebP (lossless)
    Webp,
}

impl OutputFormat {
    /// Parse a `format` parameter value. `jpg` is accepted for JPEG.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Format of a stored asset, by content type.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// MIME type advertised for this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Canonical file extension, with leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => ".jpeg",
            Self::Png => ".png",
            Self::Webp => ".webp",
        }
    }
}

/// A validated request to render an asset.
///
/// Zero for `width`, `height` or `quality` means "not requested": dimensions
/// are derived from the source and the encoder picks its default quality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TransformRequest {
    width: u32,
    height: u32,
    /// JPEG quality, 1-100. WebP output is always lossless and PNG has no
    /// quality setting, so both ignore it.
    quality: u8,
    target_format: Option<OutputFormat>,
    crop: CropStrategy,
}

impl TransformRequest {
    /// A request that returns the stored bytes unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Set the output width.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the output height.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    /// Set the encoder quality. Only JPEG output uses it.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set the output encoding.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.target_format = Some(format);
        self
    }

    /// Set the crop strategy.
    pub fn with_crop(mut self, crop: CropStrategy) -> Self {
        self.crop = crop;
        self
    }

    /// Whether nothing but the original bytes was asked for.
    pub fn is_identity(&self) -> bool {
        self.width == 0
            && self.height == 0
            && self.quality == 0
            && self.target_format.is_none()
            && self.crop == CropStrategy::None
    }

    /// Whether the request only asks for the encoding the asset already has.
    pub fn is_passthrough_for(&self, stored: Option<OutputFormat>) -> bool {
        let same_format = match self.target_format {
            None => true,
            Some(format) => Some(format) == stored,
        };
        same_format
            && self.width == 0
            && self.height == 0
            && self.quality == 0
            && self.crop == CropStrategy::None
    }

    /// Output encoding for an asset whose own format is `stored`.
    pub fn output_format(&self, stored: Option<OutputFormat>) -> Option<OutputFormat> {
        self.target_format.or(stored)
    }

    /// Build a request from decoded query parameters.
    ///
    /// Recognised keys are `width`, `height`, `size`, `quality`, `format` and
    /// `crop`; others are ignored. When a key repeats, the first value wins.
    ///
    /// # Errors
    ///
    /// The first rule violated, checked in this order: unknown `crop`,
    /// non-numeric `width`/`height`/`quality`, malformed `size`, values out
    /// of bounds, unknown `format`.
    ///
    /// # Examples
    ///
    /// ```
    /// use daguerre_transform::TransformRequest;
    ///
    /// let request = TransformRequest::parse([("width", "300"), ("size", "40x50")]).unwrap();
    /// assert_eq!(*request.width(), 40);
    /// assert_eq!(*request.height(), 50);
    ///
    /// let err = TransformRequest::parse([("quality", "101")]).unwrap_err();
    /// assert_eq!(err.message(), "quality cannot be above 100");
    /// ```
    #[tracing::instrument(skip(params))]
    pub fn parse<I, K, V>(params: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut values: HashMap<String, String> = HashMap::new();
        for (key, value) in params {
            values
                .entry(key.as_ref().to_string())
                .or_insert_with(|| value.as_ref().to_string());
        }
        let get = |key: &str| values.get(key).map(String::as_str).filter(|v| !v.is_empty());

        let crop = match get("crop") {
            Some(value) => value.parse::<CropStrategy>().map_err(|_| {
                ValidationError::new(ValidationErrorKind::UnknownCropStrategy(value.to_string()))
            })?,
            None => CropStrategy::None,
        };

        let mut width = parse_number("width", get("width"))?;
        let mut height = parse_number("height", get("height"))?;
        let quality = parse_number("quality", get("quality"))?;

        if let Some(size) = get("size") {
            (width, height) = parse_size(size, height)?;
        }

        let width = check_bounds("width", width, MAX_WIDTH)?;
        let height = check_bounds("height", height, MAX_HEIGHT)?;
        let quality = check_bounds("quality", quality, MAX_QUALITY)?;

        let target_format = match get("format") {
            Some(value) => Some(OutputFormat::parse(value).ok_or_else(|| {
                ValidationError::new(ValidationErrorKind::UnsupportedFormat(value.to_string()))
            })?),
            None => None,
        };

        let request = Self {
            width,
            height,
            // Bounded by MAX_QUALITY above
            quality: u8::try_from(quality).unwrap_or(u8::MAX),
            target_format,
            crop,
        };
        tracing::debug!(?request, "Parsed transform request");
        Ok(request)
    }
}

fn parse_number(field: &'static str, value: Option<&str>) -> Result<i64, ValidationError> {
    match value {
        None => Ok(0),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| ValidationError::new(ValidationErrorKind::NotANumber(field))),
    }
}

/// `<W>x<H>` sets both dimensions; `<N>` sets the width and keeps `height`.
fn parse_size(size: &str, height: i64) -> Result<(i64, i64), ValidationError> {
    let malformed = || ValidationError::new(ValidationErrorKind::MalformedSize(size.to_string()));

    if let Some(captures) = SIZE_PAIR.captures(size) {
        let width = captures[1].parse::<i64>().map_err(|_| malformed())?;
        let height = captures[2].parse::<i64>().map_err(|_| malformed())?;
        return Ok((width, height));
    }
    if SIZE_SINGLE.is_match(size) {
        let width = size.parse::<i64>().map_err(|_| malformed())?;
        return Ok((width, height));
    }
    Err(malformed())
}

fn check_bounds(field: &'static str, value: i64, max: u32) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::new(ValidationErrorKind::BelowMinimum(field)));
    }
    if value > i64::from(max) {
        return Err(ValidationError::new(ValidationErrorKind::AboveMaximum {
            field,
            max,
        }));
    }
    u32::try_from(value)
        .map_err(|_| ValidationError::new(ValidationErrorKind::AboveMaximum { field, max }))
}
