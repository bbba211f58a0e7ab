use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use lambda_http::http::header::{HeaderName, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use lambda_http::http::StatusCode;

use crate::encoded_stream::EncodedStream;
use crate::error::ImageLoaderError;
use crate::fallback::{TRANSPARENT_GIF, TRANSPARENT_GIF_CONTENT_TYPE};
use crate::fetch::fetch;
use crate::image_processing::transcode;
use crate::image_type::ImageType;
use crate::s3::ObjectStorage;
use crate::types::{ImageReference, LoaderOptions, ResponderOptions};

/// Content type of every successful response
pub const JPEG_CONTENT_TYPE: &str = "image/jpg";

/// HTTP response collaborator: a status line with headers, then a body
#[async_trait]
pub trait ResponseSink: Send {
    async fn write_head(
        &mut self,
        status: StatusCode,
        headers: Vec<(HeaderName, String)>,
    ) -> std::io::Result<()>;

    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()>;

    /// Mark the body as complete
    async fn end(&mut self) -> std::io::Result<()>;

    /// Give up on a response whose head was already written
    async fn abort(&mut self);
}

/// Serve the image at `image` as a JPEG, or a fallback response on failure.
///
/// Never fails: every error ends up as an HTTP response on `sink`, except
/// failures after the 200 head was written, which abort the sink.
pub async fn respond<R, S>(
    sink: &mut R,
    storage: &S,
    image: &ImageReference,
    options: &ResponderOptions,
) where
    R: ResponseSink + ?Sized,
    S: ObjectStorage + ?Sized,
{
    let (first_chunk, stream) = match prepare(storage, image, &options.loader).await {
        Ok(prepared) => prepared,
        Err(err) => return respond_with_error(sink, image, options, err).await,
    };

    if let Err(err) = write_head(sink, options.loader.standard_cache_time).await {
        return respond_with_error(sink, image, options, err.into()).await;
    }

    match stream_body(sink, first_chunk, stream).await {
        Ok(written) => {
            tracing::info!(bucket = %image.bucket, path = %image.path, bytes = written, "image served");
        }
        Err(err) => {
            tracing::error!(
                bucket = %image.bucket,
                path = %image.path,
                error = %err,
                "image stream failed after headers were sent"
            );
            if let Some(hook) = &options.on_error {
                hook(&err);
            }
            sink.abort().await;
        }
    }
}

/// Everything up to and including the first encoded chunk
async fn prepare<S>(
    storage: &S,
    image: &ImageReference,
    loader: &LoaderOptions,
) -> Result<(Bytes, EncodedStream), ImageLoaderError>
where
    S: ObjectStorage + ?Sized,
{
    image.validate()?;
    loader.validate()?;

    let image_type = ImageType::detect(&image.path);
    if !image_type.is_supported() {
        return Err(ImageLoaderError::UnsupportedType {
            path: image.path.clone(),
        });
    }
    tracing::debug!(bucket = %image.bucket, path = %image.path, image_type = image_type.as_str(), "loading image");

    let data = fetch(storage, &image.bucket, &image.path).await?;
    let mut stream = transcode(data, loader)?;

    let first_chunk = stream.next().await.unwrap_or_else(|| {
        Err(ImageLoaderError::TranscodeFailure(
            "encoder produced no output".to_string(),
        ))
    })?;

    Ok((first_chunk, stream))
}

async fn write_head<R>(sink: &mut R, cache_time: u64) -> std::io::Result<()>
where
    R: ResponseSink + ?Sized,
{
    sink.write_head(
        StatusCode::OK,
        vec![
            (CONTENT_TYPE, JPEG_CONTENT_TYPE.to_string()),
            (CACHE_CONTROL, format!("max-age={}", cache_time)),
        ],
    )
    .await
}

/// Write every chunk and wait for the end of the stream; returns the byte count
async fn stream_body<R>(
    sink: &mut R,
    first_chunk: Bytes,
    mut stream: EncodedStream,
) -> Result<usize, ImageLoaderError>
where
    R: ResponseSink + ?Sized,
{
    let mut written = first_chunk.len();
    sink.write_chunk(first_chunk).await?;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.len();
        sink.write_chunk(chunk).await?;
    }

    sink.end().await?;
    Ok(written)
}

async fn respond_with_error<R>(
    sink: &mut R,
    image: &ImageReference,
    options: &ResponderOptions,
    err: ImageLoaderError,
) where
    R: ResponseSink + ?Sized,
{
    if let Some(hook) = &options.on_error {
        hook(&err);
    }

    let status = err.status_code();
    if status == StatusCode::NOT_FOUND {
        tracing::warn!(bucket = %image.bucket, path = %image.path, error = %err, "image not found");
    } else {
        tracing::error!(bucket = %image.bucket, path = %image.path, error = %err, "image request failed");
    }

    let written = if options.use_transparent_image_fallback {
        send_transparent_image(sink, status).await
    } else {
        send_message(sink, status, err.public_message()).await
    };

    if let Err(e) = written {
        tracing::error!(status = %status, error = %e, "failed to write error response");
        sink.abort().await;
    }
}

async fn send_transparent_image<R>(sink: &mut R, status: StatusCode) -> std::io::Result<()>
where
    R: ResponseSink + ?Sized,
{
    sink.write_head(
        status,
        vec![
            (CONTENT_TYPE, TRANSPARENT_GIF_CONTENT_TYPE.to_string()),
            (CONTENT_LENGTH, TRANSPARENT_GIF.len().to_string()),
            (CACHE_CONTROL, "no-cache".to_string()),
        ],
    )
    .await?;
    sink.write_chunk(Bytes::from_static(TRANSPARENT_GIF)).await?;
    sink.end().await
}

async fn send_message<R>(sink: &mut R, status: StatusCode, message: &'static str) -> std::io::Result<()>
where
    R: ResponseSink + ?Sized,
{
    sink.write_head(
        status,
        vec![(CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
    )
    .await?;
    sink.write_chunk(Bytes::from_static(message.as_bytes())).await?;
    sink.end().await
}
