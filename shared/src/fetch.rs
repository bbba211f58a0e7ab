use bytes::Bytes;

use crate::error::ImageLoaderError;
use crate::s3::ObjectStorage;

/// Download the raw bytes of an image in a single attempt.
///
/// Any storage failure is reported as `NotFound` carrying the bucket and
/// path; a successful download without data is `EmptyPayload`.
pub async fn fetch<S>(storage: &S, bucket: &str, path: &str) -> Result<Bytes, ImageLoaderError>
where
    S: ObjectStorage + ?Sized,
{
    let data = storage.download(bucket, path).await.map_err(|source| {
        tracing::warn!(bucket = %bucket, path = %path, error = %source, "image download failed");
        ImageLoaderError::NotFound {
            bucket: bucket.to_string(),
            path: path.to_string(),
            source,
        }
    })?;

    if data.is_empty() {
        return Err(ImageLoaderError::EmptyPayload {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
    }

    tracing::debug!(bucket = %bucket, path = %path, bytes = data.len(), "image downloaded");
    Ok(data)
}
