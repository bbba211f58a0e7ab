/// Image codec derived from a storage path's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpg,
    Gif,
    Png,
    Heic,
    Tiff,
    Webp,
    Unknown,
}

impl ImageType {
    /// Detect the type from the (case-insensitive) file extension of `path`
    pub fn detect(path: &str) -> Self {
        let lower = path.to_lowercase();
        let extension = match lower.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => return Self::Unknown,
        };

        match extension {
            "jpg" | "jpeg" => Self::Jpg,
            "gif" => Self::Gif,
            "png" => Self::Png,
            "heic" => Self::Heic,
            "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            _ => Self::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != Self::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Heic => "heic",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
            Self::Unknown => "unknown",
        }
    }
}

pub fn detect_type(path: &str) -> ImageType {
    ImageType::detect(path)
}
