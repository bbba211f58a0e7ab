use crate::error::ImageLoaderError;
use std::fmt;
use std::sync::Arc;

/// Default `Cache-Control: max-age` for successful responses (5 days)
pub const DEFAULT_CACHE_TIME: u64 = 5 * 24 * 60 * 60;

// ========== IMAGE REFERENCE ==========
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub bucket: String,
    pub path: String,
}

impl ImageReference {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    /// Reject empty identifiers before any I/O happens
    pub fn validate(&self) -> Result<(), ImageLoaderError> {
        if self.bucket.is_empty() {
            return Err(ImageLoaderError::InvalidRequest("bucket is empty".to_string()));
        }
        if self.path.is_empty() {
            return Err(ImageLoaderError::InvalidRequest("path is empty".to_string()));
        }
        Ok(())
    }
}

// ========== LOADER OPTIONS ==========
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    pub max_size_bytes: u64,
    pub max_size_width: u32,
    pub quality: u8, // 1-100
    pub progressive: bool,
    pub standard_cache_time: u64, // seconds
    pub sharpen: bool,
}

impl LoaderOptions {
    /// Small previews for lists and grids
    pub const THUMBNAIL: LoaderOptions = LoaderOptions {
        max_size_bytes: 200 * 1024,
        max_size_width: 120,
        quality: 60,
        progressive: true,
        standard_cache_time: DEFAULT_CACHE_TIME,
        sharpen: false,
    };

    /// Full-size viewing
    pub const FULL: LoaderOptions = LoaderOptions {
        max_size_bytes: 2 * 1024 * 1024,
        max_size_width: 1920,
        quality: 94,
        progressive: true,
        standard_cache_time: DEFAULT_CACHE_TIME,
        sharpen: false,
    };

    pub fn new(max_size_bytes: u64, max_size_width: u32, quality: u8) -> Self {
        Self {
            max_size_bytes,
            max_size_width,
            quality,
            progressive: false,
            standard_cache_time: DEFAULT_CACHE_TIME,
            sharpen: false,
        }
    }

    pub fn with_progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    pub fn with_cache_time(mut self, seconds: u64) -> Self {
        self.standard_cache_time = seconds;
        self
    }

    pub fn with_sharpen(mut self, sharpen: bool) -> Self {
        self.sharpen = sharpen;
        self
    }

    pub fn validate(&self) -> Result<(), ImageLoaderError> {
        if self.max_size_bytes == 0 {
            return Err(ImageLoaderError::InvalidRequest(
                "max_size_bytes must be positive".to_string(),
            ));
        }
        if self.max_size_width == 0 {
            return Err(ImageLoaderError::InvalidRequest(
                "max_size_width must be positive".to_string(),
            ));
        }
        if self.quality == 0 || self.quality > 100 {
            return Err(ImageLoaderError::InvalidRequest(format!(
                "quality must be 1-100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

// ========== RESPONDER OPTIONS ==========
/// Observability hook called with the raw error of a failed request
pub type ErrorHook = Arc<dyn Fn(&ImageLoaderError) + Send + Sync>;

#[derive(Clone)]
pub struct ResponderOptions {
    pub loader: LoaderOptions,
    pub use_transparent_image_fallback: bool,
    pub on_error: Option<ErrorHook>,
}

impl ResponderOptions {
    pub fn new(loader: LoaderOptions) -> Self {
        Self {
            loader,
            use_transparent_image_fallback: false,
            on_error: None,
        }
    }

    pub fn with_transparent_fallback(mut self, enabled: bool) -> Self {
        self.use_transparent_image_fallback = enabled;
        self
    }

    pub fn with_on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ImageLoaderError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ResponderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderOptions")
            .field("loader", &self.loader)
            .field(
                "use_transparent_image_fallback",
                &self.use_transparent_image_fallback,
            )
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
