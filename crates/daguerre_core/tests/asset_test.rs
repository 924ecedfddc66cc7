//! Tests for asset buffering and fingerprinting.

use bytes::Bytes;
use daguerre_core::{Asset, AssetErrorKind, ContentHash, MediaKind, identify};
use futures::stream;

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

fn chunked(data: &'static [u8], size: usize) -> Vec<std::io::Result<Bytes>> {
    data.chunks(size)
        .map(|c| Ok(Bytes::from_static(c)))
        .collect()
}

#[tokio::test]
async fn test_stream_matches_slice_fingerprint() {
    let source = stream::iter(chunked(PNG_HEADER, 3));
    let asset = Asset::from_stream(source, None).await.unwrap();

    let expected = identify(PNG_HEADER);
    assert_eq!(asset.content_hash(), expected.content_hash());
    assert_eq!(asset.content_type(), "image/png");
    assert_eq!(*asset.kind(), MediaKind::Image);
    assert_eq!(asset.primary_extension().as_deref(), Some(".png"));
    assert_eq!(asset.bytes().as_ref(), PNG_HEADER);
}

#[tokio::test]
async fn test_location_follows_hash() {
    let asset = Asset::from_bytes(Bytes::from_static(b"location"));
    let hash = asset.content_hash().as_str();

    assert_eq!(asset.location().path_prefix(), &format!("{}/{}/{}", &hash[0..2], &hash[2..4], &hash[4..6]));
    assert_eq!(
        asset.location().storage_path(),
        &format!("{}/{}", asset.location().path_prefix(), hash)
    );
}

#[tokio::test]
async fn test_limit_is_inclusive() {
    let data: &'static [u8] = b"0123456789";

    let exact = Asset::from_stream(stream::iter(chunked(data, 4)), Some(10)).await;
    assert!(exact.is_ok());

    let over = Asset::from_stream(stream::iter(chunked(data, 4)), Some(9))
        .await
        .unwrap_err();
    assert_eq!(over.kind(), &AssetErrorKind::PayloadTooLarge { limit: 9 });
}

#[tokio::test]
async fn test_read_error_is_fatal() {
    let source = stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer hung up")),
        Ok(Bytes::from_static(b"never read")),
    ]);

    let err = Asset::from_stream(source, None).await.unwrap_err();
    assert!(matches!(err.kind(), AssetErrorKind::Read(msg) if msg.contains("peer hung up")));
}

#[tokio::test]
async fn test_identical_bytes_share_identity() {
    let first = Asset::from_stream(stream::iter(chunked(PNG_HEADER, 5)), None)
        .await
        .unwrap();
    let second = Asset::from_stream(stream::iter(chunked(PNG_HEADER, 7)), None)
        .await
        .unwrap();

    assert_eq!(first.content_hash(), second.content_hash());
    assert_eq!(first.location(), second.location());
}

#[test]
fn test_retype_updates_advertised_type_only() {
    let mut asset = Asset::from_bytes(Bytes::from_static(PNG_HEADER));
    let hash = asset.content_hash().clone();

    asset.retype("image/webp", Bytes::from_static(b"RIFF"));

    assert_eq!(asset.content_type(), "image/webp");
    assert_eq!(asset.primary_extension().as_deref(), Some(".webp"));
    assert_eq!(asset.content_hash(), &hash);
    assert_eq!(asset.content_hash(), &ContentHash::compute(PNG_HEADER));
}
