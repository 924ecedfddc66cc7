//! Asset identity for the Daguerre media store.
//!
//! Everything in this crate is a pure function of an asset's bytes:
//!
//! - **Fingerprinting**: SHA-256 content hash, computed in a single pass while the
//!   upload is buffered
//! - **Type detection**: MIME type sniffed from magic bytes, never from a filename
//! - **Extension resolution**: canonical extension for the sniffed type
//! - **Path sharding**: `h[0:2]/h[2:4]/h[4:6]/h` storage paths
//!
//! # Example
//!
//! ```rust
//! use daguerre_core::{Asset, MediaKind};
//!
//! let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
//! let asset = Asset::from_bytes(png.into());
//!
//! assert_eq!(asset.content_type(), "image/png");
//! assert_eq!(*asset.kind(), MediaKind::Image);
//! assert_eq!(asset.primary_extension().as_deref(), Some(".png"));
//! assert_eq!(asset.location().storage_path().len(), 9 + 64);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod asset;
mod extension;
mod fingerprint;
mod hash;
mod location;
mod media_kind;
mod sniff;

pub use asset::{Asset, ByteSource};
pub use extension::{Extensions, resolve_extensions};
pub use fingerprint::{Fingerprint, identify};
pub use hash::{ContentHash, HASH_HEX_LEN};
pub use location::AssetLocation;
pub use media_kind::MediaKind;
pub use sniff::{SNIFF_LEN, sniff_content_type};

pub use daguerre_error::{AssetError, AssetErrorKind};
