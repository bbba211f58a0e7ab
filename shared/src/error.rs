use lambda_http::http::StatusCode;
use thiserror::Error;

/// Failure reported by the object storage collaborator for a download
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {bucket}/{path} does not exist")]
    NotFound { bucket: String, path: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Every way a single image request can fail
#[derive(Debug, Error)]
pub enum ImageLoaderError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Image not found: {bucket}/{path}")]
    NotFound {
        bucket: String,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Image download returned no data: {bucket}/{path}")]
    EmptyPayload { bucket: String, path: String },

    #[error("Unsupported image type: {path}")]
    UnsupportedType { path: String },

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailure(String),

    #[error("Failed to write response: {0}")]
    Delivery(#[from] std::io::Error),
}

impl ImageLoaderError {
    /// HTTP status used when this error terminates a request.
    ///
    /// Only a missing object maps to 404; everything else is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ImageLoaderError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client when the transparent fallback is disabled
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "Image not found",
            _ => "Internal server error",
        }
    }
}

/// Startup configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
