//! HEIC/HEIF support.
//!
//! The `image` crate has no HEIF decoder, so these containers go through
//! libheif when the `heic` feature is enabled. Without it they are detected
//! but rejected as unreadable.

use image::DynamicImage;

use crate::error::ImageLoaderError;

/// ISO-BMFF major brands used by HEIC and HEIF stills and sequences
const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1",
];

/// Whether `data` starts with an `ftyp` box carrying a HEIF brand
pub fn is_heif(data: &[u8]) -> bool {
    match (data.get(4..8), data.get(8..12)) {
        (Some(b"ftyp"), Some(brand)) => HEIF_BRANDS.iter().any(|b| b.as_slice() == brand),
        _ => false,
    }
}

#[cfg(feature = "heic")]
mod imp {
    use image::{DynamicImage, RgbImage};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    use crate::error::ImageLoaderError;

    pub fn dimensions(data: &[u8]) -> Result<(u32, u32), ImageLoaderError> {
        let ctx = HeifContext::read_from_bytes(data)
            .map_err(|e| ImageLoaderError::UnreadableImage(format!("Failed to read HEIF container: {}", e)))?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| ImageLoaderError::UnreadableImage(format!("HEIF has no primary image: {}", e)))?;
        Ok((handle.width(), handle.height()))
    }

    pub fn decode(data: &[u8]) -> Result<DynamicImage, ImageLoaderError> {
        let failed = |e: libheif_rs::HeifError| ImageLoaderError::TranscodeFailure(format!("Failed to decode HEIF: {}", e));

        let ctx = HeifContext::read_from_bytes(data).map_err(failed)?;
        let handle = ctx.primary_image_handle().map_err(failed)?;
        let decoded = LibHeif::new()
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(failed)?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| ImageLoaderError::TranscodeFailure("HEIF decode produced no RGB plane".to_string()))?;

        // Rows may be padded past width * 3
        let row_len = plane.width as usize * 3;
        let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
        for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
            let row = row
                .get(..row_len)
                .ok_or_else(|| ImageLoaderError::TranscodeFailure("HEIF plane row too short".to_string()))?;
            pixels.extend_from_slice(row);
        }

        RgbImage::from_raw(plane.width, plane.height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| ImageLoaderError::TranscodeFailure("HEIF plane is truncated".to_string()))
    }
}

#[cfg(not(feature = "heic"))]
mod imp {
    use image::DynamicImage;

    use crate::error::ImageLoaderError;

    const DISABLED: &str = "HEIC decoding is not enabled in this build";

    pub fn dimensions(_data: &[u8]) -> Result<(u32, u32), ImageLoaderError> {
        Err(ImageLoaderError::UnreadableImage(DISABLED.to_string()))
    }

    pub fn decode(_data: &[u8]) -> Result<DynamicImage, ImageLoaderError> {
        Err(ImageLoaderError::TranscodeFailure(DISABLED.to_string()))
    }
}

/// Dimensions of the primary image
pub fn dimensions(data: &[u8]) -> Result<(u32, u32), ImageLoaderError> {
    imp::dimensions(data)
}

/// Decode the primary image to RGB with the container's transforms applied
pub fn decode(data: &[u8]) -> Result<DynamicImage, ImageLoaderError> {
    imp::decode(data)
}
