use crate::error::ConfigError;
use crate::types::{LoaderOptions, DEFAULT_CACHE_TIME};

/// Deployment settings, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub bucket: String,
    pub use_transparent_fallback: bool,
    pub standard_cache_time: u64,
}

impl LoaderConfig {
    /// Build the config from environment variables.
    ///
    /// - IMAGE_BUCKET (required)
    /// - USE_TRANSPARENT_FALLBACK (default: true)
    /// - STANDARD_CACHE_TIME in seconds (default: 5 days)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup("IMAGE_BUCKET")
            .filter(|b| !b.is_empty())
            .ok_or(ConfigError::Missing("IMAGE_BUCKET"))?;

        let use_transparent_fallback = match lookup("USE_TRANSPARENT_FALLBACK") {
            None => true,
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "USE_TRANSPARENT_FALLBACK",
                value,
            })?,
        };

        let standard_cache_time = match lookup("STANDARD_CACHE_TIME") {
            None => DEFAULT_CACHE_TIME,
            Some(value) => value.parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "STANDARD_CACHE_TIME",
                value,
            })?,
        };

        Ok(Self {
            bucket,
            use_transparent_fallback,
            standard_cache_time,
        })
    }

    pub fn thumbnail_options(&self) -> LoaderOptions {
        LoaderOptions::THUMBNAIL.with_cache_time(self.standard_cache_time)
    }

    pub fn full_options(&self) -> LoaderOptions {
        LoaderOptions::FULL.with_cache_time(self.standard_cache_time)
    }
}

/// Parse a boolean flag from an environment variable or query parameter
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
