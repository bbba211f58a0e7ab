use bytes::Bytes;
use image::{imageops::FilterType, io::Reader as ImageReader, DynamicImage};
use jpeg_encoder::{ColorType, Encoder};
use std::io::{Cursor, Write};

use crate::encoded_stream::EncodedStream;
use crate::error::ImageLoaderError;
use crate::heif;
use crate::types::LoaderOptions;

/// Gaussian sigma of the unsharp mask applied when sharpening is requested
pub const SHARPEN_SIGMA: f32 = 0.9;

/// Fetched image bytes plus the metadata probed from their header
#[derive(Debug, Clone)]
pub struct RawImage {
    data: Bytes,
    width: u32,
    height: u32,
    heif: bool,
}

impl RawImage {
    /// Read the pixel dimensions without decoding the full image
    pub fn probe(data: Bytes) -> Result<Self, ImageLoaderError> {
        let heif = heif::is_heif(&data);
        let (width, height) = if heif {
            heif::dimensions(&data)?
        } else {
            ImageReader::new(Cursor::new(data.as_ref()))
                .with_guessed_format()
                .map_err(|e| ImageLoaderError::UnreadableImage(format!("Failed to read header: {}", e)))?
                .into_dimensions()
                .map_err(|e| ImageLoaderError::UnreadableImage(format!("Failed to read dimensions: {}", e)))?
        };

        if width == 0 {
            return Err(ImageLoaderError::UnreadableImage("image has zero width".to_string()));
        }

        Ok(Self {
            data,
            width,
            height,
            heif,
        })
    }

    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn decode(&self) -> Result<DynamicImage, ImageLoaderError> {
        if self.heif {
            return heif::decode(&self.data);
        }
        image::load_from_memory(&self.data)
            .map_err(|e| ImageLoaderError::TranscodeFailure(format!("Failed to load image: {}", e)))
    }
}

/// Downscale decision for one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizePlan {
    pub scale: f64,
    pub width: u32,
}

/// Decide whether an image must shrink to fit the byte and width budgets.
///
/// Returns `None` when both budgets are already met. Otherwise the more
/// restrictive of the two ratios is applied to the width. Never upsizes.
pub fn plan_resize(byte_len: u64, width: u32, options: &LoaderOptions) -> Option<ResizePlan> {
    if byte_len <= options.max_size_bytes && width <= options.max_size_width {
        return None;
    }

    let byte_ratio = (options.max_size_bytes as f64 / byte_len as f64).min(1.0);
    let width_ratio = (options.max_size_width as f64 / width as f64).min(1.0);
    let scale = byte_ratio.min(width_ratio);
    let new_width = (width as f64 * scale).round().max(1.0) as u32;

    Some(ResizePlan {
        scale,
        width: new_width,
    })
}

/// Height that keeps the aspect ratio when the width becomes `new_width`
fn scaled_height(width: u32, height: u32, new_width: u32) -> u32 {
    let scaled = (height as f64 * new_width as f64 / width as f64).round();
    scaled.max(1.0) as u32
}

/// Primary EXIF orientation tag (1-8), if the container carries one
fn read_orientation(data: &[u8]) -> Option<u32> {
    let metadata = exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;
    metadata.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
        .value
        .get_uint(0)
}

/// Rotate/flip so that an image tagged with `orientation` displays upright
fn apply_orientation(img: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.rotate90().fliph(),
        Some(6) => img.rotate90(),
        Some(7) => img.rotate270().fliph(),
        Some(8) => img.rotate270(),
        _ => img,
    }
}

/// Re-encode fetched bytes as a JPEG that respects `options`.
///
/// The header is probed up front so unreadable payloads fail here; decoding
/// and encoding happen lazily on the blocking pool as the stream is consumed.
pub fn transcode(data: Bytes, options: &LoaderOptions) -> Result<EncodedStream, ImageLoaderError> {
    let raw = RawImage::probe(data)?;
    let plan = plan_resize(raw.byte_len(), raw.width(), options);

    match plan {
        Some(plan) => tracing::info!(
            bytes = raw.byte_len(),
            width = raw.width(),
            height = raw.height(),
            scale = plan.scale,
            new_width = plan.width,
            new_height = scaled_height(raw.width(), raw.height(), plan.width),
            "downscaling image"
        ),
        None => tracing::debug!(
            bytes = raw.byte_len(),
            width = raw.width(),
            height = raw.height(),
            "image within budget, re-encoding only"
        ),
    }

    let options = options.clone();
    Ok(EncodedStream::spawn(move |out| render(&raw, plan, &options, out)))
}

/// Decode, optionally resize and sharpen, then write the JPEG to `out`
fn render<W: Write>(
    raw: &RawImage,
    plan: Option<ResizePlan>,
    options: &LoaderOptions,
    out: W,
) -> Result<(), ImageLoaderError> {
    let mut img = raw.decode()?;

    if let Some(plan) = plan {
        // libheif already applies the container's rotation while decoding
        if !raw.heif {
            img = apply_orientation(img, read_orientation(&raw.data));
        }
        let new_height = scaled_height(img.width(), img.height(), plan.width);
        img = img.resize_exact(plan.width, new_height, FilterType::Lanczos3);
    }

    if options.sharpen {
        img = img.unsharpen(SHARPEN_SIGMA, 0);
    }

    encode_jpeg(&img, options.quality, options.progressive, out)
}

fn encode_jpeg<W: Write>(
    img: &DynamicImage,
    quality: u8,
    progressive: bool,
    out: W,
) -> Result<(), ImageLoaderError> {
    let rgb = img.to_rgb8();
    let (width, height) = match (u16::try_from(rgb.width()), u16::try_from(rgb.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(ImageLoaderError::TranscodeFailure(format!(
                "{}x{} exceeds the JPEG size limit",
                rgb.width(),
                rgb.height()
            )))
        }
    };

    let mut encoder = Encoder::new(out, quality);
    encoder.set_progressive(progressive);
    encoder
        .encode(rgb.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| ImageLoaderError::TranscodeFailure(format!("Failed to encode JPEG: {}", e)))
}
