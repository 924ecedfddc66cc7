//! Top-level error wrapper types.

use crate::{
    AssetError, AssetErrorKind, ConfigError, ImageError, ImageErrorKind, StorageError,
    StorageErrorKind, ValidationError,
};

/// Every error a Daguerre operation can produce.
///
/// # Examples
///
/// ```
/// use daguerre_error::{DaguerreError, StorageError, StorageErrorKind};
///
/// let storage_err = StorageError::new(StorageErrorKind::Unavailable("bucket".to_string()));
/// let err: DaguerreError = storage_err.into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum DaguerreErrorKind {
    /// Asset identity or ingestion error
    #[from(AssetError)]
    Asset(AssetError),
    /// Storage backend error
    #[from(StorageError)]
    Storage(StorageError),
    /// Transform parameter validation error
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Image engine error
    #[from(ImageError)]
    Image(ImageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Daguerre error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Daguerre Error: {}", _0)]
pub struct DaguerreError(Box<DaguerreErrorKind>);

impl DaguerreError {
    /// Create a new error from a kind.
    pub fn new(kind: DaguerreErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DaguerreErrorKind {
        &self.0
    }

    /// Message suitable for returning to a client.
    ///
    /// Validation and lookup failures are specific; internal failures are
    /// generic so that paths and backend details stay in the logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            DaguerreErrorKind::Validation(e) => e.message(),
            DaguerreErrorKind::Asset(e) => match e.kind() {
                AssetErrorKind::InvalidIdentifier(_) => "Invalid id".to_string(),
                AssetErrorKind::PayloadTooLarge { .. } => "File is too large".to_string(),
                AssetErrorKind::UnsupportedContentForTransform(_) => {
                    "File type doesn't support transforms".to_string()
                }
                AssetErrorKind::Read(_) => "Error reading file".to_string(),
            },
            DaguerreErrorKind::Storage(e) => match e.kind() {
                StorageErrorKind::NotFound(_) => "File not found".to_string(),
                _ => "Error accessing storage".to_string(),
            },
            DaguerreErrorKind::Image(e) => match e.kind() {
                ImageErrorKind::Cancelled => "Request cancelled".to_string(),
                _ => "Error transforming image".to_string(),
            },
            DaguerreErrorKind::Config(_) => "Invalid configuration".to_string(),
        }
    }
}

// Generic From implementation for any type that converts to DaguerreErrorKind
impl<T> From<T> for DaguerreError
where
    T: Into<DaguerreErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Daguerre operations.
pub type DaguerreResult<T> = std::result::Result<T, DaguerreError>;
