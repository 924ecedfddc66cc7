//! Tests for filesystem storage backend.

use bytes::Bytes;
use daguerre_core::{Asset, AssetLocation};
use daguerre_storage::{AssetStorage, FileSystemStorage, PutOutcome, StorageErrorKind};
use std::path::Path;
use tempfile::TempDir;

fn files_under(root: &Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                found.push(path);
            }
        }
    }
    found
}

#[tokio::test]
async fn test_store_and_retrieve() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let asset = Asset::from_bytes(Bytes::from_static(b"Hello, world!"));

    let outcome = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();
    assert_eq!(outcome, PutOutcome::Created);

    let retrieved = storage.get(asset.location()).await.unwrap();
    assert_eq!(retrieved, *asset.bytes());
}

#[tokio::test]
async fn test_deduplication() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let asset = Asset::from_bytes(Bytes::from_static(b"Duplicate content"));

    let first = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();
    let second = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();

    assert_eq!(first, PutOutcome::Created);
    assert_eq!(second, PutOutcome::AlreadyExists);

    // Exactly one object, no leftover staging files
    let files = files_under(temp_dir.path());
    assert_eq!(files, vec![storage.object_path(asset.location())]);
    assert_eq!(
        std::fs::read(&files[0]).unwrap(),
        asset.bytes().as_ref()
    );
}

#[tokio::test]
async fn test_existing_object_is_never_overwritten() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let asset = Asset::from_bytes(Bytes::from_static(b"original"));
    storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();

    let outcome = storage
        .put(asset.location(), Bytes::from_static(b"something else"))
        .await
        .unwrap();

    assert_eq!(outcome, PutOutcome::AlreadyExists);
    assert_eq!(
        storage.get(asset.location()).await.unwrap(),
        Bytes::from_static(b"original")
    );
}

#[tokio::test]
async fn test_concurrent_identical_puts() {
    let temp_dir = TempDir::new().unwrap();
    let storage = std::sync::Arc::new(FileSystemStorage::new(temp_dir.path()).unwrap());
    let asset = Asset::from_bytes(Bytes::from(vec![7u8; 64 * 1024]));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let storage = storage.clone();
        let location = asset.location().clone();
        let bytes = asset.bytes().clone();
        handles.push(tokio::spawn(async move {
            storage.put(&location, bytes).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let files = files_under(temp_dir.path());
    assert_eq!(files.len(), 1);
    assert!(!files.iter().any(|f| FileSystemStorage::is_staging_file(f)));
    assert_eq!(storage.get(asset.location()).await.unwrap(), *asset.bytes());
}

#[tokio::test(flavor = "current_thread")]
async fn test_large_commit_on_single_threaded_runtime() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();
    let content: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let asset = Asset::from_bytes(Bytes::from(content));

    let outcome = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();
    assert_eq!(outcome, PutOutcome::Created);

    let stored = storage.get(asset.location()).await.unwrap();
    assert_eq!(stored.len(), 4 * 1024 * 1024);
    assert_eq!(stored, *asset.bytes());

    let files = files_under(temp_dir.path());
    assert_eq!(files.len(), 1);
    assert!(!FileSystemStorage::is_staging_file(&files[0]));
}

#[tokio::test]
async fn test_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let location = AssetLocation::derive(&"ab".repeat(32)).unwrap();
    let err = storage.get(&location).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        err.kind(),
        &StorageErrorKind::NotFound(location.storage_path().clone())
    );
}

#[tokio::test]
async fn test_content_addressable_structure() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let asset = Asset::from_bytes(Bytes::from_static(b"Test structure"));
    storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();

    let hash = asset.content_hash().as_str();
    let expected = temp_dir
        .path()
        .join(&hash[0..2])
        .join(&hash[2..4])
        .join(&hash[4..6])
        .join(hash);
    assert!(expected.is_file());
}

#[tokio::test]
async fn test_failed_write_leaves_nothing_behind() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();
    let asset = Asset::from_bytes(Bytes::from_static(b"blocked"));

    // A plain file where the first shard directory should be
    let shard = temp_dir.path().join(&asset.content_hash().as_str()[0..2]);
    std::fs::write(&shard, b"not a directory").unwrap();

    let err = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        StorageErrorKind::DirectoryCreation(_) | StorageErrorKind::FileRead(_)
    ));

    let files = files_under(temp_dir.path());
    assert_eq!(files, vec![shard]);
}

#[tokio::test]
async fn test_backend_name() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();
    assert_eq!(storage.backend_name(), "filesystem");
}
