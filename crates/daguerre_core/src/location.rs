//! Sharded storage paths.

use crate::ContentHash;
use daguerre_error::AssetError;
use derive_getters::Getters;

/// Where an asset lives in any backend, relative to the backend's root.
///
/// Structure: `{hash[0:2]}/{hash[2:4]}/{hash[4:6]}/{hash}`
///
/// ```text
/// e3/
/// └── b0/
///     └── c4/
///         └── e3b0c44298fc...  (the asset)
/// ```
///
/// Three levels of two hex characters bound each directory to 256 entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct AssetLocation {
    /// Full relative path of the object
    storage_path: String,
    /// Directory portion of `storage_path`, for backends that must create it first
    path_prefix: String,
}

impl AssetLocation {
    /// Derive the location for a validated hash.
    pub fn for_hash(hash: &ContentHash) -> Self {
        let h = hash.as_str();
        let path_prefix = format!("{}/{}/{}", &h[0..2], &h[2..4], &h[4..6]);
        let storage_path = format!("{}/{}", path_prefix, h);
        Self {
            storage_path,
            path_prefix,
        }
    }

    /// Derive the location for a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` unless `identifier` is exactly 64 hex characters.
    pub fn derive(identifier: &str) -> Result<Self, AssetError> {
        let hash = ContentHash::parse(identifier)?;
        Ok(Self::for_hash(&hash))
    }
}
