//! Transform parameter validation errors.
//!
//! Every variant names the query parameter it rejects, and its display text
//! is safe to return to clients verbatim.

/// Specific validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ValidationErrorKind {
    /// Parameter is not an integer
    #[display("{} must be a number", _0)]
    NotANumber(&'static str),
    /// Parameter is negative
    #[display("{} cannot be less than 0", _0)]
    BelowMinimum(&'static str),
    /// Parameter exceeds its ceiling
    #[display("{} cannot be above {}", field, max)]
    AboveMaximum {
        /// The parameter name
        field: &'static str,
        /// Largest accepted value
        max: u32,
    },
    /// `size` is neither `<W>x<H>` nor `<N>`
    #[display("incorrect format for size")]
    MalformedSize(String),
    /// `crop` is not a known focal-point strategy
    #[display("Unknown crop algorithm '{}'", _0)]
    UnknownCropStrategy(String),
    /// `format` is not a supported output encoding
    #[display("Unknown image format '{}'", _0)]
    UnsupportedFormat(String),
}

impl ValidationErrorKind {
    /// Name of the offending parameter.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NotANumber(field) | Self::BelowMinimum(field) => *field,
            Self::AboveMaximum { field, .. } => *field,
            Self::MalformedSize(_) => "size",
            Self::UnknownCropStrategy(_) => "crop",
            Self::UnsupportedFormat(_) => "format",
        }
    }
}

/// Validation error with location tracking.
///
/// # Examples
///
/// ```
/// use daguerre_error::{ValidationError, ValidationErrorKind};
///
/// let err = ValidationError::new(ValidationErrorKind::AboveMaximum { field: "width", max: 5000 });
/// assert_eq!(err.field(), "width");
/// assert_eq!(err.message(), "width cannot be above 5000");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {} at line {} in {}", kind, line, file)]
pub struct ValidationError {
    kind: ValidationErrorKind,
    line: u32,
    file: &'static str,
}

impl ValidationError {
    /// Create a new validation error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ValidationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// Name of the offending parameter.
    pub fn field(&self) -> &'static str {
        self.kind.field()
    }

    /// Client-facing message without source location.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
