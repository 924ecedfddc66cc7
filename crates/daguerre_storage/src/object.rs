//! Object-store backed asset storage.
//!
//! Wraps any [`ObjectStore`] (in-memory, Amazon S3, Google Cloud Storage,
//! S3-compatible services such as Linode) behind the [`AssetStorage`]
//! contract. Keys are `{prefix}/{storage_path}`.

use crate::{AssetStorage, BucketProvisioner, PutOutcome, StorageResult};
use bytes::Bytes;
use daguerre_core::AssetLocation;
use daguerre_error::{StorageError, StorageErrorKind};
use object_store::{
    Attribute, Attributes, ObjectStore, PutMode, PutOptions, PutPayload, path::Path,
};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Asset storage on top of an object store.
#[derive(Debug, Clone)]
pub struct ObjectStoreStorage {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    name: &'static str,
    storage_class: Option<String>,
    provisioner: Option<Arc<dyn BucketProvisioner>>,
    /// Set once the bucket is known to exist; shared by clones.
    provisioned: Arc<OnceCell<()>>,
}

impl ObjectStoreStorage {
    /// Wrap an existing object store.
    ///
    /// `prefix` is prepended to every key; leading and trailing slashes are
    /// ignored. `name` identifies the backend in logs.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl AsRef<str>, name: &'static str) -> Self {
        let prefix = prefix.as_ref().trim_matches('/').to_string();
        tracing::info!(backend = name, prefix = %prefix, "Created object store storage");
        Self {
            store,
            prefix,
            name,
            storage_class: None,
            provisioner: None,
            provisioned: Arc::new(OnceCell::new()),
        }
    }

    /// Storage class recorded on every object written.
    pub fn with_storage_class(mut self, storage_class: Option<String>) -> Self {
        self.storage_class = storage_class.filter(|class| !class.is_empty());
        self
    }

    /// Create the bucket through `provisioner` before the first storage call.
    pub fn with_provisioner(mut self, provisioner: Arc<dyn BucketProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// Run the provisioner once. A failure is returned and retried on the next call.
    async fn ready(&self) -> StorageResult<()> {
        let Some(provisioner) = &self.provisioner else {
            return Ok(());
        };
        self.provisioned
            .get_or_try_init(|| async {
                provisioner.ensure_bucket().await?;
                tracing::info!(backend = self.name, bucket = provisioner.bucket(), "Bucket ready");
                Ok::<(), StorageError>(())
            })
            .await?;
        Ok(())
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(class) = &self.storage_class {
            attributes.insert(Attribute::StorageClass, class.clone().into());
        }
        attributes
    }

    /// In-process storage, for tests and single-process deployments.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()), "", "memory")
    }

    /// The wrapped object store.
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    /// Object key for a location.
    pub fn key(&self, location: &AssetLocation) -> Path {
        if self.prefix.is_empty() {
            Path::from(location.storage_path().as_str())
        } else {
            Path::from(format!("{}/{}", self.prefix, location.storage_path()))
        }
    }

    /// Existence check followed by an unconditional write.
    ///
    /// Used when the store cannot create-if-absent atomically. Two racing
    /// uploads may both write, but they write identical bytes.
    async fn put_if_absent_fallback(&self, key: &Path, content: Bytes) -> StorageResult<PutOutcome> {
        match self.store.head(key).await {
            Ok(_) => return Ok(PutOutcome::AlreadyExists),
            Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(self.read_error(key, e)),
        }

        let options = PutOptions {
            attributes: self.attributes(),
            ..Default::default()
        };
        self.store
            .put_opts(key, PutPayload::from(content), options)
            .await
            .map_err(|e| self.write_error(key, e))?;
        Ok(PutOutcome::Created)
    }

    fn read_error(&self, key: &Path, e: object_store::Error) -> StorageError {
        match e {
            object_store::Error::NotFound { .. } => {
                StorageError::new(StorageErrorKind::NotFound(key.to_string()))
            }
            e => StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", key, e))),
        }
    }

    fn write_error(&self, key: &Path, e: object_store::Error) -> StorageError {
        StorageError::new(StorageErrorKind::FileWrite(format!("{}: {}", key, e)))
    }
}

#[async_trait::async_trait]
impl AssetStorage for ObjectStoreStorage {
    #[tracing::instrument(skip(self), fields(backend = self.name, path = %location.storage_path()))]
    async fn get(&self, location: &AssetLocation) -> StorageResult<Bytes> {
        self.ready().await?;
        let key = self.key(location);

        let result = self.store.get(&key).await.map_err(|e| self.read_error(&key, e))?;
        // Buffer the whole body so a failure mid-stream never yields partial data.
        let data = result.bytes().await.map_err(|e| self.read_error(&key, e))?;

        tracing::debug!(key = %key, size = data.len(), "Retrieved asset object");
        Ok(data)
    }

    #[tracing::instrument(skip(self, content), fields(backend = self.name, path = %location.storage_path(), size = content.len()))]
    async fn put(&self, location: &AssetLocation, content: Bytes) -> StorageResult<PutOutcome> {
        self.ready().await?;
        let key = self.key(location);
        let size = content.len();
        let options = PutOptions {
            mode: PutMode::Create,
            attributes: self.attributes(),
            ..Default::default()
        };

        let outcome = match self
            .store
            .put_opts(&key, PutPayload::from(content.clone()), options)
            .await
        {
            Ok(_) => PutOutcome::Created,
            Err(object_store::Error::AlreadyExists { .. }) => PutOutcome::AlreadyExists,
            Err(object_store::Error::NotImplemented { .. }) => {
                tracing::debug!(key = %key, "Conditional put unsupported, checking existence first");
                self.put_if_absent_fallback(&key, content).await?
            }
            Err(e) => return Err(self.write_error(&key, e)),
        };

        tracing::info!(key = %key, size, outcome = %outcome, "Stored asset object");
        Ok(outcome)
    }

    fn backend_name(&self) -> &'static str {
        self.name
    }
}
