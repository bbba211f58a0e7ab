use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;

use crate::error::StorageError;

/// Object storage collaborator.
///
/// Implementations are expected to be already scoped and authorized for the
/// buckets they are asked about; no credential handling happens here.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Download the whole object stored at `bucket`/`path`
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, StorageError>;
}

#[async_trait]
impl ObjectStorage for S3Client {
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, StorageError> {
        let result = self
            .get_object()
            .bucket(bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                err if err.is_no_such_key() => StorageError::NotFound {
                    bucket: bucket.to_string(),
                    path: path.to_string(),
                },
                err => StorageError::Backend(format!(
                    "Failed to get object from S3: {}",
                    DisplayErrorContext(&err)
                )),
            })?;

        let body_bytes = result
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to read S3 body: {}", e)))?
            .into_bytes();

        Ok(body_bytes)
    }
}
