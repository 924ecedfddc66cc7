//! Filesystem-based asset storage implementation.
//!
//! This backend stores assets in a content-addressable directory tree,
//! sharded by content hash.

use crate::{AssetStorage, PutOutcome, StorageResult};
use bytes::Bytes;
use daguerre_core::AssetLocation;
use daguerre_error::{StorageError, StorageErrorKind};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Prefix of in-flight staging files inside a shard directory.
const STAGING_PREFIX: &str = ".staging-";

/// Filesystem storage backend.
///
/// Stores assets in a content-addressable structure:
/// `{base_path}/{hash[0:2]}/{hash[2:4]}/{hash[4:6]}/{hash}`
///
/// # Example Structure
///
/// ```text
/// /var/daguerre/assets/
/// ├── ab/
/// │   └── cd/
/// │       └── ef/
/// │           └── abcdef123456...  (PNG file)
/// └── 12/
///     └── 34/
///         └── 56/
///             └── 123456abcdef...  (PDF file)
/// ```
///
/// # Features
///
/// - **Content-addressable**: Files stored by SHA-256 hash
/// - **Automatic deduplication**: Same content = same hash = same file
/// - **Staged writes**: Content lands in a temp file that is committed with a
///   no-clobber rename, so readers never see a partial object
pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    /// Create a new filesystem storage backend.
    ///
    /// Creates the base directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or accessed.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Created filesystem storage");
        Ok(Self { base_path })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute path of a stored object.
    pub fn object_path(&self, location: &AssetLocation) -> PathBuf {
        self.base_path.join(location.storage_path())
    }

    /// Whether a directory entry is an uncommitted staging file.
    pub fn is_staging_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(STAGING_PREFIX))
    }

    /// Write `content` to a staging file in `dir` and commit it to `target`.
    ///
    /// Runs on the blocking pool. The no-clobber rename publishes the object
    /// whole or not at all, and the staging file deletes itself when dropped,
    /// so a failed write leaves nothing behind.
    async fn stage_and_commit(
        dir: PathBuf,
        target: PathBuf,
        content: Bytes,
    ) -> StorageResult<PutOutcome> {
        tokio::task::spawn_blocking(move || commit_staged(&dir, &target, &content))
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "staging task failed: {}",
                    e
                )))
            })?
    }
}

fn commit_staged(dir: &Path, target: &Path, content: &[u8]) -> StorageResult<PutOutcome> {
    let write_error = |e: std::io::Error| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            target.display(),
            e
        )))
    };

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)
        .map_err(write_error)?;
    staged.write_all(content).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;

    match staged.persist_noclobber(target) {
        Ok(_) => Ok(PutOutcome::Created),
        // Lost a race against an identical upload.
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(PutOutcome::AlreadyExists),
        Err(e) => Err(write_error(e.error)),
    }
}

#[async_trait::async_trait]
impl AssetStorage for FileSystemStorage {
    #[tracing::instrument(skip(self), fields(path = %location.storage_path()))]
    async fn get(&self, location: &AssetLocation) -> StorageResult<Bytes> {
        let path = self.object_path(location);

        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(location.storage_path().clone()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        tracing::debug!(path = %path.display(), size = data.len(), "Retrieved asset file");
        Ok(Bytes::from(data))
    }

    #[tracing::instrument(skip(self, content), fields(path = %location.storage_path(), size = content.len()))]
    async fn put(&self, location: &AssetLocation, content: Bytes) -> StorageResult<PutOutcome> {
        let target = self.object_path(location);

        // If file already exists, there is nothing to do (deduplication)
        let exists = tokio::fs::try_exists(&target).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                target.display(),
                e
            )))
        })?;
        if exists {
            tracing::debug!(path = %target.display(), "Asset already exists, skipping write");
            return Ok(PutOutcome::AlreadyExists);
        }

        let dir = self.base_path.join(location.path_prefix());
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;

        let outcome = Self::stage_and_commit(dir, target.clone(), content.clone()).await?;

        tracing::info!(
            path = %target.display(),
            size = content.len(),
            outcome = %outcome,
            "Stored asset file"
        );
        Ok(outcome)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
