//! Image engine errors.

/// Kinds of image engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ImageErrorKind {
    /// The engine could not decode the stored bytes
    #[display("Failed to decode image: {}", _0)]
    Decode(String),
    /// The engine could not encode the output
    #[display("Failed to encode image: {}", _0)]
    Encode(String),
    /// The engine has no encoder for the requested format
    #[display("Unsupported image format: {}", _0)]
    UnsupportedFormat(String),
    /// The caller cancelled the read while the transform was running
    #[display("Transform cancelled")]
    Cancelled,
    /// The worker running the transform panicked or was aborted
    #[display("Transform worker failed: {}", _0)]
    Worker(String),
}

/// Image engine error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Image Error: {} at line {} in {}", kind, line, file)]
pub struct ImageError {
    kind: ImageErrorKind,
    line: u32,
    file: &'static str,
}

impl ImageError {
    /// Create a new image error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ImageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ImageErrorKind {
        &self.kind
    }
}
