//! The asset orchestrator: ingest and read.

use bytes::Bytes;
use daguerre_core::{Asset, AssetLocation, ContentHash};
use daguerre_error::{
    AssetError, AssetErrorKind, DaguerreResult, ImageError, ImageErrorKind, StorageError,
    StorageErrorKind,
};
use daguerre_storage::{AssetStorage, StorageResult};
use daguerre_transform::{ImageEngine, OutputFormat, RasterEngine, ResizeSpec, TransformRequest};
use derive_getters::Getters;
use futures::Stream;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-service limits.
///
/// Every [`AssetService`] carries its own copy, so services with different
/// limits and backends can run side by side.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ServiceConfig {
    /// Upload ceiling in bytes
    max_file_size: Option<u64>,
    /// Deadline for a storage write
    upload_timeout: Option<Duration>,
    /// Deadline for a storage read
    download_timeout: Option<Duration>,
}

impl ServiceConfig {
    /// No ceiling and no deadlines.
    pub fn new() -> Self {
        Self {
            max_file_size: None,
            upload_timeout: None,
            download_timeout: None,
        }
    }

    /// Set the upload ceiling.
    pub fn with_max_file_size(mut self, bytes: Option<u64>) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the storage write deadline.
    pub fn with_upload_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set the storage read deadline.
    pub fn with_download_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.download_timeout = timeout;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes returned by a read, with the type they should be served as.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Rendition {
    bytes: Bytes,
    content_type: String,
    extension: Option<String>,
}

impl Rendition {
    /// Release the bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl From<Asset> for Rendition {
    fn from(asset: Asset) -> Self {
        Self {
            content_type: asset.content_type().clone(),
            extension: asset.primary_extension().clone(),
            bytes: asset.into_bytes(),
        }
    }
}

/// Ingests and serves assets against one storage backend.
///
/// Cheap to clone; clones share the backend and the engine.
pub struct AssetService<E: ImageEngine = RasterEngine> {
    config: ServiceConfig,
    storage: Arc<dyn AssetStorage>,
    engine: Arc<E>,
}

impl<E: ImageEngine> Clone for AssetService<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            storage: self.storage.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<E: ImageEngine> std::fmt::Debug for AssetService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetService")
            .field("config", &self.config)
            .field("backend", &self.storage.backend_name())
            .finish()
    }
}

impl AssetService<RasterEngine> {
    /// Service using the raster engine.
    pub fn with_raster_engine(config: ServiceConfig, storage: Arc<dyn AssetStorage>) -> Self {
        Self::new(config, storage, Arc::new(RasterEngine::new()))
    }
}

impl<E: ImageEngine> AssetService<E> {
    /// Assemble a service from its collaborators.
    pub fn new(config: ServiceConfig, storage: Arc<dyn AssetStorage>, engine: Arc<E>) -> Self {
        tracing::info!(backend = storage.backend_name(), ?config, "Created asset service");
        Self {
            config,
            storage,
            engine,
        }
    }

    /// Service limits.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn AssetStorage> {
        &self.storage
    }

    /// The image engine.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Store an upload and return its identifier.
    ///
    /// Uploading the same bytes again returns the same identifier and writes
    /// nothing.
    pub async fn ingest<S>(&self, source: S) -> DaguerreResult<ContentHash>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin + Send,
    {
        self.ingest_with_cancel(source, &CancellationToken::new())
            .await
    }

    /// [`ingest`](Self::ingest), abandoned promptly once `cancel` fires.
    ///
    /// A cancelled ingest may or may not have stored the object, but never
    /// leaves a partial one.
    #[tracing::instrument(skip(self, source, cancel), fields(backend = self.storage.backend_name()))]
    pub async fn ingest_with_cancel<S>(
        &self,
        source: S,
        cancel: &CancellationToken,
    ) -> DaguerreResult<ContentHash>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin + Send,
    {
        let asset = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(cancelled("upload").into());
            }
            asset = Asset::from_stream(source, self.config.max_file_size) => asset?,
        };

        let location = asset.location();
        let outcome = guarded(
            cancel,
            self.config.upload_timeout,
            location.storage_path(),
            self.storage.put(location, asset.bytes().clone()),
        )
        .await?;

        tracing::info!(
            hash = %asset.content_hash(),
            content_type = %asset.content_type(),
            size = asset.bytes().len(),
            %outcome,
            "Ingested asset"
        );
        Ok(asset.content_hash().clone())
    }

    /// Serve an asset, transformed as requested.
    pub async fn read(
        &self,
        identifier: &str,
        request: &TransformRequest,
    ) -> DaguerreResult<Rendition> {
        self.read_with_cancel(identifier, request, &CancellationToken::new())
            .await
    }

    /// Validate raw query parameters, then [`read`](Self::read).
    ///
    /// Nothing touches storage unless every parameter is valid.
    pub async fn read_query<I, K, V>(&self, identifier: &str, params: I) -> DaguerreResult<Rendition>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let request = TransformRequest::parse(params)?;
        self.read(identifier, &request).await
    }

    /// [`read`](Self::read), abandoned promptly once `cancel` fires.
    #[tracing::instrument(skip(self, request, cancel), fields(backend = self.storage.backend_name()))]
    pub async fn read_with_cancel(
        &self,
        identifier: &str,
        request: &TransformRequest,
        cancel: &CancellationToken,
    ) -> DaguerreResult<Rendition> {
        let hash = ContentHash::parse(identifier)?;
        let location = AssetLocation::for_hash(&hash);

        let bytes = guarded(
            cancel,
            self.config.download_timeout,
            location.storage_path(),
            self.storage.get(&location),
        )
        .await?;

        let mut asset = Asset::from_bytes(bytes);
        if asset.content_hash() != &hash {
            tracing::error!(
                expected = %hash,
                actual = %asset.content_hash(),
                "Stored object does not match its identifier"
            );
            return Err(StorageError::new(StorageErrorKind::Corrupted(
                location.storage_path().clone(),
            ))
            .into());
        }

        let stored_format = OutputFormat::from_content_type(asset.content_type());
        if request.is_passthrough_for(stored_format) {
            tracing::debug!(hash = %hash, content_type = %asset.content_type(), "Serving stored bytes");
            return Ok(Rendition::from(asset));
        }

        let format = match request.output_format(stored_format) {
            Some(format) if asset.is_image() => format,
            _ => {
                return Err(AssetError::new(AssetErrorKind::UnsupportedContentForTransform(
                    asset.content_type().clone(),
                ))
                .into());
            }
        };

        let rendered = self
            .render(asset.bytes().clone(), request, format, cancel)
            .await?;
        asset.retype(format.content_type(), rendered);

        tracing::info!(
            hash = %hash,
            content_type = %asset.content_type(),
            size = asset.bytes().len(),
            "Transformed asset"
        );
        Ok(Rendition::from(asset))
    }

    /// Run the engine on the blocking pool.
    async fn render(
        &self,
        source: Bytes,
        request: &TransformRequest,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> DaguerreResult<Bytes> {
        let engine = self.engine.clone();
        let spec = ResizeSpec::from(request);
        let quality = *request.quality();

        let task =
            tokio::task::spawn_blocking(move || engine.render(&source, &spec, format, quality));

        let rendered = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Transform cancelled");
                return Err(ImageError::new(ImageErrorKind::Cancelled).into());
            }
            joined = task => joined.map_err(|e| {
                tracing::error!(error = %e, "Transform worker failed");
                ImageError::new(ImageErrorKind::Worker(e.to_string()))
            })??,
        };
        Ok(Bytes::from(rendered))
    }
}

fn cancelled(path: &str) -> StorageError {
    StorageError::new(StorageErrorKind::Cancelled(path.to_string()))
}

/// Race a storage call against cancellation and an optional deadline.
///
/// The losing future is dropped, which abandons the call.
async fn guarded<T, F>(
    cancel: &CancellationToken,
    deadline: Option<Duration>,
    path: &str,
    operation: F,
) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    let bounded = async {
        match deadline {
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(path, seconds = limit.as_secs(), "Storage call timed out");
                    Err(StorageError::new(StorageErrorKind::Timeout {
                        path: path.to_string(),
                        seconds: limit.as_secs(),
                    }))
                }
            },
            None => operation.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(path, "Storage call cancelled");
            Err(cancelled(path))
        }
        result = bounded => result,
    }
}
