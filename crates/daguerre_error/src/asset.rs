//! Asset identity and ingestion errors.

/// Kinds of asset errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AssetErrorKind {
    /// Identifier is not a 64-character hex SHA-256 digest
    #[display("Invalid identifier '{}': expected 64 hex characters", _0)]
    InvalidIdentifier(String),
    /// Upload exceeded the configured byte ceiling
    #[display("Payload exceeds the limit of {} bytes", limit)]
    PayloadTooLarge {
        /// Configured ceiling in bytes
        limit: u64,
    },
    /// Reading the upload source failed
    #[display("Failed to read asset source: {}", _0)]
    Read(String),
    /// A transform was requested for content that is not an image
    #[display("Content type '{}' does not support transforms", _0)]
    UnsupportedContentForTransform(String),
}

/// Asset error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Asset Error: {} at line {} in {}", kind, line, file)]
pub struct AssetError {
    kind: AssetErrorKind,
    line: u32,
    file: &'static str,
}

impl AssetError {
    /// Create a new asset error with caller location tracking.
    #[track_caller]
    pub fn new(kind: AssetErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &AssetErrorKind {
        &self.kind
    }
}
