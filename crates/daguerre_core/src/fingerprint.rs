//! Content fingerprints.

use crate::{ContentHash, MediaKind, resolve_extensions, sniff_content_type};
use derive_getters::{Dissolve, Getters};

/// Identity and type of a byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, Dissolve, serde::Serialize)]
pub struct Fingerprint {
    /// SHA-256 of the bytes
    content_hash: ContentHash,
    /// Sniffed MIME type
    content_type: String,
    /// Category derived from `content_type`
    kind: MediaKind,
    /// Canonical extension with leading dot
    primary_extension: Option<String>,
    /// All candidate extensions when ambiguous
    all_extensions: Vec<String>,
}

impl Fingerprint {
    /// Type a byte sequence whose hash is already known.
    pub(crate) fn with_hash(content_hash: ContentHash, data: &[u8]) -> Self {
        let content_type = sniff_content_type(data).to_string();
        let kind = MediaKind::from_content_type(&content_type);
        let (primary_extension, all_extensions) =
            resolve_extensions(&content_type).into_parts();
        Self {
            content_hash,
            content_type,
            kind,
            primary_extension,
            all_extensions,
        }
    }
}

/// Fingerprint a complete byte sequence.
///
/// The result is a pure function of `data`.
pub fn identify(data: &[u8]) -> Fingerprint {
    Fingerprint::with_hash(ContentHash::compute(data), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_png() {
        let fp = identify(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01");
        assert_eq!(fp.content_type(), "image/png");
        assert_eq!(*fp.kind(), MediaKind::Image);
        assert_eq!(fp.primary_extension().as_deref(), Some(".png"));
        assert!(fp.all_extensions().is_empty());
    }

    #[test]
    fn test_identify_ignores_misleading_names() {
        // Text that merely mentions an image format is still text.
        let fp = identify(b"photo.png");
        assert_eq!(fp.content_type(), "text/plain; charset=utf-8");
        assert_eq!(*fp.kind(), MediaKind::Opaque);
    }

    #[test]
    fn test_identify_is_deterministic() {
        let data = b"\xff\xd8\xff\xe0 some jpeg bytes";
        assert_eq!(identify(data), identify(data));
    }
}
