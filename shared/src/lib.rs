pub mod config;
pub mod encoded_stream;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod heif;
pub mod image_processing;
pub mod image_proxy;
pub mod image_type;
pub mod s3;
pub mod types;

#[cfg(test)]
mod testing;

use aws_sdk_s3::Client as S3Client;
use std::sync::Arc;

pub use config::{parse_flag, LoaderConfig};
pub use encoded_stream::EncodedStream;
pub use error::{ConfigError, ImageLoaderError, StorageError};
pub use fallback::TRANSPARENT_GIF;
pub use fetch::fetch;
pub use image_processing::{plan_resize, transcode, RawImage, ResizePlan};
pub use image_proxy::{respond, ResponseSink};
pub use image_type::{detect_type, ImageType};
pub use s3::ObjectStorage;
pub use types::{ImageReference, LoaderOptions, ResponderOptions, DEFAULT_CACHE_TIME};

/// Shared application state
pub struct AppState {
    pub s3_client: S3Client,
    pub config: LoaderConfig,
}

impl AppState {
    pub fn new(s3_client: S3Client, config: LoaderConfig) -> Arc<Self> {
        Arc::new(Self { s3_client, config })
    }
}
