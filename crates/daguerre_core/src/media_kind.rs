//! Coarse media categories.

/// Category derived from a sniffed content type.
///
/// Only [`MediaKind::Image`] assets may be transformed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    derive_more::Display,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// JPEG, PNG, or WebP content
    #[display("image")]
    Image,
    /// Anything else; stored and served verbatim
    #[display("opaque")]
    Opaque,
}

/// Content types the image engine can decode.
const IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

impl MediaKind {
    /// Categorize a content type.
    pub fn from_content_type(content_type: &str) -> Self {
        if IMAGE_TYPES.contains(&content_type) {
            MediaKind::Image
        } else {
            MediaKind::Opaque
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Opaque => "opaque",
        }
    }
}
