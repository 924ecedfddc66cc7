//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write object
    #[display("Failed to write object: {}", _0)]
    FileWrite(String),
    /// Failed to read object
    #[display("Failed to read object: {}", _0)]
    FileRead(String),
    /// No object at the derived path
    #[display("Object not found: {}", _0)]
    NotFound(String),
    /// Invalid storage configuration
    #[display("Invalid configuration: {}", _0)]
    InvalidConfig(String),
    /// Stored bytes no longer hash to their identifier
    #[display("Stored object is corrupted: {}", _0)]
    Corrupted(String),
    /// The backend's bucket could be neither found nor created
    #[display("Storage unavailable: {}", _0)]
    Unavailable(String),
    /// The caller cancelled the operation before it completed
    #[display("Storage operation cancelled: {}", _0)]
    Cancelled(String),
    /// The operation exceeded its configured deadline
    #[display("Storage operation timed out after {}s: {}", seconds, path)]
    Timeout {
        /// Path the operation targeted
        path: String,
        /// Deadline in seconds
        seconds: u64,
    },
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use daguerre_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("ab/cd/ef/abcdef".to_string()));
/// assert!(err.is_not_found());
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StorageErrorKind {
        &self.kind
    }

    /// Whether the backend reported that no object exists at the path.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StorageErrorKind::NotFound(_))
    }
}
