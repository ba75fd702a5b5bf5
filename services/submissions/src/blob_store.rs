use crate::config::S3Config;
use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Errors from the object storage backend
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("upload timed out after {0:?}")]
    Timeout(Duration),
}

/// Durable object storage for submission files
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return the public URL it is served from
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, BlobError>;

    /// Remove an object; used to clean up after a rolled back submission
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Generate the object key for one file of a submission
/// Format: submissions/{submission_id}/{unix_millis}-{slot}-{file_name}
///
/// The submission id keeps every object of a submission under one prefix.
/// The slot keeps files of one submission apart when their names sanitize
/// to the same string within the same millisecond.
pub fn object_key(
    submission_id: Uuid,
    slot: usize,
    uploaded_at: DateTime<Utc>,
    file_name: &str,
) -> String {
    format!(
        "submissions/{submission_id}/{timestamp}-{slot}-{name}",
        timestamp = uploaded_at.timestamp_millis(),
        name = sanitize_file_name(file_name)
    )
}

/// Sanitize a file name to a single safe path component
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned.to_string()
    }
}

/// S3-compatible blob store (AWS S3, R2, MinIO)
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
    config: S3Config,
}

impl S3BlobStore {
    /// Create a new S3 blob store
    pub async fn new(config: &S3Config) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for R2/MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 blob store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            config: config.clone(),
        })
    }

    /// Public URL an object key is served from
    pub fn public_url(&self, key: &str) -> String {
        public_url(&self.config.public_url_prefix, key)
    }

    /// Simple single-part upload for small files
    async fn simple_upload(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Multipart upload for large files
    ///
    /// A failed part or completion aborts the upload so S3 drops the parts
    /// already stored.
    async fn multipart_upload(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), String> {
        let create_response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let upload_id = create_response
            .upload_id()
            .ok_or_else(|| "No upload ID in response".to_string())?;

        let result = self.upload_parts(key, upload_id, &data).await;

        finish_or_abort(result, || async move {
            self.client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
    }

    async fn upload_parts(&self, key: &str, upload_id: &str, data: &Bytes) -> Result<(), String> {
        let mut completed_parts = Vec::new();

        for (index, chunk) in data.chunks(self.config.part_size_bytes).enumerate() {
            let part_number = index as i32 + 1;

            let upload_part_response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(data.slice_ref(chunk)))
                .send()
                .await
                .map_err(|e| e.to_string())?;

            completed_parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(upload_part_response.e_tag().unwrap_or_default())
                    .build(),
            );
        }

        let completed_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }
}

/// Run `abort` when `result` failed; the original error is returned either way
async fn finish_or_abort<F, Fut>(result: Result<(), String>, abort: F) -> Result<(), String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    if let Err(upload_error) = &result {
        match abort().await {
            Ok(()) => debug!(error = %upload_error, "Aborted multipart upload"),
            Err(e) => warn!(error = %e, "Failed to abort multipart upload"),
        }
    }
    result
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, data), fields(size_bytes = data.len()))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, BlobError> {
        debug!(key = %key, "Uploading file to S3");

        let result = if data.len() > self.config.multipart_threshold_bytes {
            self.multipart_upload(key, data, content_type).await
        } else {
            self.simple_upload(key, data, content_type).await
        };

        result.map_err(|message| BlobError::Upload {
            key: key.to_string(),
            message,
        })?;

        info!(key = %key, "File uploaded successfully");
        Ok(self.public_url(key))
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        debug!(key = %key, "File deleted from S3");
        Ok(())
    }
}

pub(crate) fn public_url(prefix: &str, key: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), key)
}
