//! Backend selection and construction.

use crate::{
    AssetStorage, FileSystemStorage, GcsBucketProvisioner, ObjectStoreStorage,
    S3BucketProvisioner, StorageResult,
};
use daguerre_error::{StorageError, StorageErrorKind};
use derive_getters::Getters;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Which backend to use and how to reach it.
///
/// # Example
///
/// ```toml
/// [storage]
/// kind = "s3"
/// bucket = "assets"
/// region = "us-east-1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local directory tree
    Filesystem(FilesystemConfig),
    /// In-process object store; contents vanish with the process
    Memory,
    /// Amazon S3 or an S3-compatible endpoint
    S3(S3Config),
    /// Google Cloud Storage
    Gcloud(GcloudConfig),
    /// Linode Object Storage
    Linode(LinodeConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem(FilesystemConfig::default())
    }
}

/// Filesystem backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct FilesystemConfig {
    /// Root directory for stored assets.
    #[serde(default = "default_filesystem_path")]
    path: PathBuf,
}

fn default_filesystem_path() -> PathBuf {
    std::env::temp_dir().join("daguerre")
}

impl FilesystemConfig {
    /// Settings rooted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            path: default_filesystem_path(),
        }
    }
}

/// Amazon S3 settings. Credentials come from the standard `AWS_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct S3Config {
    /// Bucket name.
    bucket: String,
    /// Bucket region.
    region: String,
    /// Custom endpoint for S3-compatible services.
    #[serde(default)]
    endpoint: Option<String>,
    /// Key prefix for every object.
    #[serde(default)]
    prefix: String,
    /// Storage class for written objects, e.g. `STANDARD_IA`.
    #[serde(default)]
    storage_class: Option<String>,
}

/// Google Cloud Storage settings. Credentials come from `GOOGLE_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GcloudConfig {
    /// Bucket name.
    bucket: String,
    /// Key prefix for every object.
    #[serde(default)]
    prefix: String,
    /// Project that owns the bucket when it has to be created.
    #[serde(default)]
    project_id: Option<String>,
    /// Location for a newly created bucket.
    #[serde(default = "default_gcloud_location")]
    location: String,
    /// Default storage class for a newly created bucket, e.g. `NEARLINE`.
    #[serde(default)]
    storage_class: Option<String>,
}

fn default_gcloud_location() -> String {
    "US".to_string()
}

/// Linode Object Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct LinodeConfig {
    /// Bucket name.
    bucket: String,
    /// Cluster region, e.g. `us-east-1`.
    region: String,
    /// Key prefix for every object.
    #[serde(default)]
    prefix: String,
    /// Storage class for written objects.
    #[serde(default = "default_linode_storage_class")]
    storage_class: String,
}

fn default_linode_storage_class() -> String {
    "STANDARD".to_string()
}

impl LinodeConfig {
    /// S3-compatible endpoint for the region.
    pub fn endpoint(&self) -> String {
        format!("https://{}.linodeobjects.com", self.region)
    }
}

fn invalid_config(message: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorKind::InvalidConfig(message.into()))
}

fn require(field: &str, value: &str, backend: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(invalid_config(format!("{} requires a {}", backend, field)));
    }
    Ok(())
}

fn s3_store(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
) -> StorageResult<object_store::aws::AmazonS3> {
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(region);
    if let Some(endpoint) = endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    builder
        .build()
        .map_err(|e| invalid_config(format!("s3 bucket {}: {}", bucket, e)))
}

/// Construct the configured backend.
///
/// This is a one-time setup step; the returned backend is shared by every
/// request. Remote backends create their bucket, if it is missing, on their
/// first storage call rather than here.
///
/// # Errors
///
/// `InvalidConfig` for missing settings or rejected credentials,
/// `DirectoryCreation` if the filesystem root cannot be created.
#[tracing::instrument(skip(config))]
pub fn build_storage(config: &StorageConfig) -> StorageResult<Arc<dyn AssetStorage>> {
    let storage: Arc<dyn AssetStorage> = match config {
        StorageConfig::Filesystem(fs) => Arc::new(FileSystemStorage::new(fs.path())?),
        StorageConfig::Memory => Arc::new(ObjectStoreStorage::in_memory()),
        StorageConfig::S3(s3) => {
            require("bucket", s3.bucket(), "s3")?;
            require("region", s3.region(), "s3")?;
            let store = s3_store(s3.bucket(), s3.region(), s3.endpoint().as_deref())?;
            let provisioner =
                S3BucketProvisioner::new(s3.bucket(), s3.region(), s3.endpoint().clone());
            Arc::new(
                ObjectStoreStorage::new(Arc::new(store), s3.prefix(), "s3")
                    .with_storage_class(s3.storage_class().clone())
                    .with_provisioner(Arc::new(provisioner)),
            )
        }
        StorageConfig::Gcloud(gcs) => {
            require("bucket", gcs.bucket(), "gcloud")?;
            require("location", gcs.location(), "gcloud")?;
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(gcs.bucket())
                .build()
                .map_err(|e| invalid_config(format!("gcloud bucket {}: {}", gcs.bucket(), e)))?;
            let provisioner = GcsBucketProvisioner::new(
                gcs.bucket(),
                gcs.project_id().clone(),
                gcs.location(),
                gcs.storage_class().clone(),
            );
            Arc::new(
                ObjectStoreStorage::new(Arc::new(store), gcs.prefix(), "gcloud")
                    .with_provisioner(Arc::new(provisioner)),
            )
        }
        StorageConfig::Linode(linode) => {
            require("bucket", linode.bucket(), "linode")?;
            require("region", linode.region(), "linode")?;
            let endpoint = linode.endpoint();
            let store = s3_store(linode.bucket(), linode.region(), Some(&endpoint))?;
            let provisioner =
                S3BucketProvisioner::new(linode.bucket(), linode.region(), Some(endpoint));
            Arc::new(
                ObjectStoreStorage::new(Arc::new(store), linode.prefix(), "linode")
                    .with_storage_class(Some(linode.storage_class().clone()))
                    .with_provisioner(Arc::new(provisioner)),
            )
        }
    };

    tracing::info!(backend = storage.backend_name(), "Using storage backend");
    Ok(storage)
}
