//! Tests for the object-store backend, using the in-memory store.

use bytes::Bytes;
use daguerre_core::{Asset, AssetLocation};
use daguerre_storage::{
    AssetStorage, BucketProvisioner, ObjectStoreStorage, PutOutcome, StorageConfig,
    StorageError, StorageErrorKind, StorageResult, build_storage,
};
use object_store::{Attribute, ObjectStore, memory::InMemory, path::Path};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provisioner double that counts calls and fails the first `failures` of them.
#[derive(Debug, Default)]
struct CountingProvisioner {
    calls: AtomicUsize,
    failures: usize,
}

#[async_trait::async_trait]
impl BucketProvisioner for CountingProvisioner {
    async fn ensure_bucket(&self) -> StorageResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(StorageError::new(StorageErrorKind::Unavailable(
                "bucket assets: connection refused".to_string(),
            )));
        }
        Ok(())
    }

    fn bucket(&self) -> &str {
        "assets"
    }
}

#[tokio::test]
async fn test_put_is_idempotent() {
    let storage = ObjectStoreStorage::in_memory();
    let asset = Asset::from_bytes(Bytes::from_static(b"object bytes"));

    let first = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();
    let second = storage
        .put(asset.location(), Bytes::from_static(b"different"))
        .await
        .unwrap();

    assert_eq!(first, PutOutcome::Created);
    assert_eq!(second, PutOutcome::AlreadyExists);
    assert_eq!(storage.get(asset.location()).await.unwrap(), *asset.bytes());
}

#[tokio::test]
async fn test_keys_use_prefix_and_shards() {
    let store = Arc::new(InMemory::new());
    let storage = ObjectStoreStorage::new(store.clone(), "/media/", "memory");
    let asset = Asset::from_bytes(Bytes::from_static(b"prefixed"));

    storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();

    let expected = Path::from(format!("media/{}", asset.location().storage_path()));
    assert_eq!(storage.key(asset.location()), expected);
    let stored = store.get(&expected).await.unwrap().bytes().await.unwrap();
    assert_eq!(stored, *asset.bytes());
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let storage = ObjectStoreStorage::in_memory();
    let location = AssetLocation::derive(&"0f".repeat(32)).unwrap();

    let err = storage.get(&location).await.unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_storage_config_from_json() {
    let config: StorageConfig = serde_json::from_str(
        r#"{"kind": "linode", "bucket": "assets", "region": "us-east-1"}"#,
    )
    .unwrap();
    assert!(matches!(config, StorageConfig::Linode(_)));

    let memory: StorageConfig = serde_json::from_str(r#"{"kind": "memory"}"#).unwrap();
    assert_eq!(memory, StorageConfig::Memory);

    let unknown = serde_json::from_str::<StorageConfig>(r#"{"kind": "ftp"}"#);
    assert!(unknown.is_err());
}

#[tokio::test]
async fn test_independent_backends_side_by_side() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let filesystem = build_storage(&StorageConfig::Filesystem(
        daguerre_storage::FilesystemConfig::new(temp_dir.path()),
    ))
    .unwrap();
    let memory = build_storage(&StorageConfig::Memory).unwrap();

    let asset = Asset::from_bytes(Bytes::from_static(b"side by side"));
    filesystem
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();

    assert!(filesystem.get(asset.location()).await.is_ok());
    assert!(memory.get(asset.location()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_bucket_is_provisioned_once_on_first_use() {
    let provisioner = Arc::new(CountingProvisioner::default());
    let storage = ObjectStoreStorage::new(Arc::new(InMemory::new()), "", "s3")
        .with_provisioner(provisioner.clone());
    assert_eq!(provisioner.calls.load(Ordering::SeqCst), 0);

    let asset = Asset::from_bytes(Bytes::from_static(b"first use"));
    let clone = storage.clone();
    let (a, b) = tokio::join!(
        storage.put(asset.location(), asset.bytes().clone()),
        clone.put(asset.location(), asset.bytes().clone()),
    );
    a.unwrap();
    b.unwrap();
    storage.get(asset.location()).await.unwrap();

    assert_eq!(provisioner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_provisioning_is_unavailable_and_retried() {
    let provisioner = Arc::new(CountingProvisioner {
        failures: 1,
        ..Default::default()
    });
    let storage = ObjectStoreStorage::new(Arc::new(InMemory::new()), "", "gcloud")
        .with_provisioner(provisioner.clone());
    let asset = Asset::from_bytes(Bytes::from_static(b"unreachable"));

    let err = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), StorageErrorKind::Unavailable(_)));

    let outcome = storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();
    assert_eq!(outcome, PutOutcome::Created);
    assert_eq!(provisioner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_storage_class_is_recorded() {
    let store = Arc::new(InMemory::new());
    let storage = ObjectStoreStorage::new(store.clone(), "", "linode")
        .with_storage_class(Some("STANDARD".to_string()));
    let asset = Asset::from_bytes(Bytes::from_static(b"classy"));

    storage
        .put(asset.location(), asset.bytes().clone())
        .await
        .unwrap();

    let stored = store.get(&storage.key(asset.location())).await.unwrap();
    let class: &str = stored.attributes.get(&Attribute::StorageClass).unwrap().as_ref();
    assert_eq!(class, "STANDARD");
}
