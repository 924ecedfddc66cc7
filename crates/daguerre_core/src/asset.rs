//! Assets: fingerprinted bytes bound to their storage location.

use crate::{AssetLocation, ContentHash, Fingerprint, MediaKind, resolve_extensions};
use bytes::{Bytes, BytesMut};
use daguerre_error::{AssetError, AssetErrorKind};
use derive_getters::Getters;
use futures::{Stream, StreamExt, stream::BoxStream};
use sha2::{Digest, Sha256};

/// A non-seekable source of upload bytes.
pub type ByteSource<'a> = BoxStream<'a, std::io::Result<Bytes>>;

/// One stored object, constructed fresh for every ingest or read.
///
/// The asset owns its raw bytes for the duration of a single operation;
/// they are released when the asset is dropped, whichever way the
/// operation ends.
#[derive(Debug, Clone, Getters)]
pub struct Asset {
    /// SHA-256 of the raw bytes; the asset's identity
    content_hash: ContentHash,
    /// Sniffed MIME type
    content_type: String,
    /// Category derived from `content_type`
    kind: MediaKind,
    /// Canonical extension with leading dot
    primary_extension: Option<String>,
    /// All candidate extensions when ambiguous
    all_extensions: Vec<String>,
    /// Derived storage location
    location: AssetLocation,
    /// Raw bytes as received
    bytes: Bytes,
}

impl Asset {
    /// Fingerprint an in-memory buffer.
    pub fn from_bytes(bytes: Bytes) -> Self {
        let fingerprint = crate::identify(&bytes);
        Self::assemble(fingerprint, bytes)
    }

    /// Buffer and fingerprint a stream in a single pass.
    ///
    /// Each chunk is hashed as it is appended to the buffer; the source is
    /// never read twice. When `limit` is set, the first chunk that would
    /// take the buffer past it aborts the read.
    ///
    /// # Errors
    ///
    /// - `Read` if the source yields an I/O error
    /// - `PayloadTooLarge` if the source exceeds `limit` bytes
    #[tracing::instrument(skip(source))]
    pub async fn from_stream<S>(mut source: S, limit: Option<u64>) -> Result<Self, AssetError>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin,
    {
        let mut hasher = Sha256::new();
        let mut buffer = BytesMut::new();

        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::error!(error = %e, "Failed to buffer asset source");
                AssetError::new(AssetErrorKind::Read(e.to_string()))
            })?;

            if let Some(limit) = limit {
                if (buffer.len() + chunk.len()) as u64 > limit {
                    tracing::debug!(limit, "Asset source exceeded size limit");
                    return Err(AssetError::new(AssetErrorKind::PayloadTooLarge { limit }));
                }
            }

            hasher.update(&chunk);
            buffer.extend_from_slice(&chunk);
        }

        let bytes = buffer.freeze();
        let fingerprint = Fingerprint::with_hash(ContentHash::from_hasher(hasher), &bytes);
        tracing::debug!(
            hash = %fingerprint.content_hash(),
            content_type = %fingerprint.content_type(),
            size = bytes.len(),
            "Buffered asset"
        );
        Ok(Self::assemble(fingerprint, bytes))
    }

    fn assemble(fingerprint: Fingerprint, bytes: Bytes) -> Self {
        let (content_hash, content_type, kind, primary_extension, all_extensions) =
            fingerprint.dissolve();
        let location = AssetLocation::for_hash(&content_hash);
        Self {
            content_hash,
            content_type,
            kind,
            primary_extension,
            all_extensions,
            location,
            bytes,
        }
    }

    /// Advertise a new content type after the bytes have been re-encoded.
    ///
    /// Identity and location stay those of the stored object.
    pub fn retype(&mut self, content_type: &str, bytes: Bytes) {
        let (primary_extension, all_extensions) = resolve_extensions(content_type).into_parts();
        self.content_type = content_type.to_string();
        self.kind = MediaKind::from_content_type(content_type);
        self.primary_extension = primary_extension;
        self.all_extensions = all_extensions;
        self.bytes = bytes;
    }

    /// Whether the asset may be transformed.
    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    /// Release the raw bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}
