//! Bucket provisioning for remote object stores.
//!
//! `object_store` reads and writes objects but cannot create buckets, so each
//! remote backend carries a provisioner that checks for its bucket and creates
//! it when absent. [`ObjectStoreStorage`](crate::ObjectStoreStorage) runs it
//! once, before its first storage call.

use crate::StorageResult;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client as S3Client,
    config::Region,
    error::DisplayErrorContext,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use daguerre_error::{StorageError, StorageErrorKind};
use google_cloud_storage::{
    client::{Client as GcsClient, ClientConfig},
    http::buckets::{
        get::GetBucketRequest,
        insert::{BucketCreationConfig, InsertBucketParam, InsertBucketRequest},
    },
};

/// AWS rejects an explicit location constraint for its default region.
const AWS_DEFAULT_REGION: &str = "us-east-1";

/// Makes sure a backend's bucket exists.
#[async_trait::async_trait]
pub trait BucketProvisioner: Send + Sync + std::fmt::Debug {
    /// Create the bucket if it is missing. An existing bucket is left alone.
    ///
    /// # Errors
    ///
    /// `Unavailable` when the bucket can be neither found nor created.
    async fn ensure_bucket(&self) -> StorageResult<()>;

    /// Name of the bucket this provisioner manages.
    fn bucket(&self) -> &str;
}

fn unavailable(bucket: &str, message: impl std::fmt::Display) -> StorageError {
    StorageError::new(StorageErrorKind::Unavailable(format!(
        "bucket {}: {}",
        bucket, message
    )))
}

/// Provisioner for Amazon S3 and S3-compatible services such as Linode.
#[derive(Debug, Clone)]
pub struct S3BucketProvisioner {
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3BucketProvisioner {
    /// Provisioner for `bucket` in `region`, optionally at a custom endpoint.
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint,
        }
    }

    /// Location constraint sent with `CreateBucket`.
    ///
    /// Only AWS itself takes one, and never for its default region.
    fn location_constraint(&self) -> Option<CreateBucketConfiguration> {
        let on_aws = self
            .endpoint
            .as_deref()
            .is_none_or(|endpoint| endpoint.contains("amazonaws.com"));
        (on_aws && self.region != AWS_DEFAULT_REGION).then(|| {
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build()
        })
    }

    async fn client(&self) -> S3Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()));
        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        S3Client::new(&loader.load().await)
    }
}

#[async_trait::async_trait]
impl BucketProvisioner for S3BucketProvisioner {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket, region = %self.region))]
    async fn ensure_bucket(&self) -> StorageResult<()> {
        let client = self.client().await;

        match client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::debug!("Bucket exists");
                return Ok(());
            }
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => {}
            Err(e) => return Err(unavailable(&self.bucket, DisplayErrorContext(&e))),
        }

        tracing::info!("Creating bucket");
        let mut request = client.create_bucket().bucket(&self.bucket);
        if let Some(configuration) = self.location_constraint() {
            request = request.create_bucket_configuration(configuration);
        }
        match request.send().await {
            Ok(_) => Ok(()),
            // Created by a concurrent process since the head request.
            Err(e) if e
                .as_service_error()
                .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(e) => Err(unavailable(&self.bucket, DisplayErrorContext(&e))),
        }
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Provisioner for Google Cloud Storage.
#[derive(Debug, Clone)]
pub struct GcsBucketProvisioner {
    bucket: String,
    project_id: Option<String>,
    location: String,
    storage_class: Option<String>,
}

impl GcsBucketProvisioner {
    /// Provisioner for `bucket`, created in `location` when missing.
    ///
    /// Without a `project_id` the project of the ambient credentials is used.
    pub fn new(
        bucket: impl Into<String>,
        project_id: Option<String>,
        location: impl Into<String>,
        storage_class: Option<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            project_id,
            location: location.into(),
            storage_class,
        }
    }
}

#[async_trait::async_trait]
impl BucketProvisioner for GcsBucketProvisioner {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket, location = %self.location))]
    async fn ensure_bucket(&self) -> StorageResult<()> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| unavailable(&self.bucket, format!("GCS credentials: {}", e)))?;
        let project = self.project_id.clone().or_else(|| config.project_id.clone());
        let client = GcsClient::new(config);

        let lookup = GetBucketRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };
        match client.get_bucket(&lookup).await {
            Ok(_) => {
                tracing::debug!("Bucket exists");
                return Ok(());
            }
            Err(google_cloud_storage::http::Error::Response(response)) if response.code == 404 => {}
            Err(e) => return Err(unavailable(&self.bucket, e)),
        }

        let project = project.ok_or_else(|| {
            StorageError::new(StorageErrorKind::InvalidConfig(format!(
                "gcloud bucket {} is missing and no project_id is configured",
                self.bucket
            )))
        })?;

        tracing::info!(project = %project, "Creating bucket");
        let request = InsertBucketRequest {
            name: self.bucket.clone(),
            param: InsertBucketParam {
                project,
                ..Default::default()
            },
            bucket: BucketCreationConfig {
                location: self.location.clone(),
                storage_class: self.storage_class.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        match client.insert_bucket(&request).await {
            Ok(_) => Ok(()),
            // Created by a concurrent process since the lookup.
            Err(google_cloud_storage::http::Error::Response(response)) if response.code == 409 => {
                Ok(())
            }
            Err(e) => Err(unavailable(&self.bucket, e)),
        }
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
