//! S3 object store
//!
//! Bodies are streamed from disk with `ByteStream::from_path`; an upload is
//! never buffered whole in memory.
//!
//! # Example
//!
//! ```no_run
//! use tubely::config::StorageConfig;
//! use tubely::storage::{ObjectStore, S3ObjectStore};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorageConfig {
//!     bucket: "tubely-videos".to_string(),
//!     region: "us-east-2".to_string(),
//!     endpoint: None,
//!     access_key: None,
//!     secret_key: None,
//!     public_base_url: None,
//! };
//! let store = S3ObjectStore::from_config(&config).await;
//! store
//!     .put_object("landscape/abc.mp4", "video/mp4", Path::new("/tmp/abc.mp4"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use super::{ObjectStore, PutObjectOutput, StorageError};
use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use std::time::Instant;

/// S3-backed [`ObjectStore`]
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from configuration.
    ///
    /// Static credentials are used when both keys are configured; otherwise
    /// the AWS default credential chain applies. A custom endpoint switches
    /// to path-style addressing for S3-compatible stores.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let region = Region::new(config.region.clone());

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "tubely-config",
                )),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region.clone())
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        }
        .region(region);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(true)
                .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, source),
        fields(
            s3.bucket = %self.bucket,
            s3.key = %key,
            http.content_type = %content_type,
            upload.bytes = tracing::field::Empty,
            s3.etag = tracing::field::Empty
        ),
        err
    )]
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        source: &Path,
    ) -> Result<PutObjectOutput, StorageError> {
        let start_time = Instant::now();
        let bytes_written = tokio::fs::metadata(source).await?.len();
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        let etag = output.e_tag().map(str::to_string);

        let span = tracing::Span::current();
        span.record("upload.bytes", bytes_written);
        if let Some(etag) = &etag {
            span.record("s3.etag", etag.as_str());
        }

        tracing::info!(
            bytes_written,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "PutObject completed"
        );

        Ok(PutObjectOutput {
            etag,
            bytes_written,
        })
    }

    #[tracing::instrument(
        name = "s3.delete_object",
        skip(self),
        fields(s3.bucket = %self.bucket, s3.key = %key),
        err
    )]
    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
