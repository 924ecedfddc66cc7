//! Content hashes.

use daguerre_error::{AssetError, AssetErrorKind};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 digest of an asset's raw bytes.
///
/// This is the asset's permanent public identifier.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash a complete byte slice.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self::from_hasher(hasher)
    }

    /// Finish an incremental hasher.
    pub(crate) fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Validate a client-supplied identifier.
    ///
    /// The identifier must be exactly 64 ASCII hex characters. Uppercase
    /// digits are accepted and normalized. Nothing is ever truncated or padded.
    ///
    /// # Errors
    ///
    /// Returns [`AssetErrorKind::InvalidIdentifier`] for any other input.
    pub fn parse(identifier: &str) -> Result<Self, AssetError> {
        if identifier.len() != HASH_HEX_LEN
            || !identifier.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(AssetError::new(AssetErrorKind::InvalidIdentifier(
                identifier.to_string(),
            )));
        }
        Ok(Self(identifier.to_ascii_lowercase()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ContentHash {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
