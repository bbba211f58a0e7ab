//! In-memory collaborators and fixtures for unit tests

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lambda_http::http::header::HeaderName;
use lambda_http::http::StatusCode;
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::StorageError;
use crate::image_proxy::ResponseSink;
use crate::s3::ObjectStorage;

/// Encode a gradient image of the given size
pub fn encode_fixture(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

/// 1x1 lossless WebP
pub const LOSSLESS_WEBP: &[u8] = &[
    0x52, 0x49, 0x46, 0x46, 0x1a, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50, 0x56, 0x50, 0x38, 0x4c,
    0x0d, 0x00, 0x00, 0x00, 0x2f, 0x00, 0x00, 0x00, 0x10, 0x07, 0x10, 0x11, 0x11, 0x88, 0x88, 0xfe,
    0x07, 0x00,
];

/// JPEG whose APP1 segment carries a single EXIF orientation tag
pub fn jpeg_with_orientation(width: u16, height: u16, orientation: u8) -> Vec<u8> {
    // Big-endian TIFF header, one IFD entry: tag 0x0112, SHORT, count 1
    let mut exif = b"Exif\0\0".to_vec();
    exif.extend_from_slice(&[
        0x4d, 0x4d, 0x00, 0x2a, 0x00, 0x00, 0x00, 0x08, 0x00, 0x01, 0x01, 0x12, 0x00, 0x03, 0x00,
        0x00, 0x00, 0x01, 0x00, orientation, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ]);

    let pixels = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut buf, 90);
    encoder.add_app_segment(1, &exif).unwrap();
    encoder
        .encode(pixels.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .unwrap();
    buf
}

/// Minimal ISO-BMFF header branded as HEIC
pub fn heic_header() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypheic");
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    data.extend_from_slice(b"mif1heic");
    data
}

/// HEVC-encoded HEIC of a flat-colour image
#[cfg(feature = "heic")]
pub fn encode_heic(width: u32, height: u32) -> Vec<u8> {
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };

    let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).unwrap();
    image
        .create_plane(Channel::Interleaved, width, height, 8)
        .unwrap();
    let planes = image.planes_mut();
    let plane = planes.interleaved.unwrap();
    for row in plane.data.chunks_mut(plane.stride) {
        for px in row[..width as usize * 3].chunks_mut(3) {
            px.copy_from_slice(&[200, 100, 50]);
        }
    }

    let lib_heif = LibHeif::new();
    let mut context = HeifContext::new().unwrap();
    let mut encoder = lib_heif.encoder_for_format(CompressionFormat::Hevc).unwrap();
    encoder.set_quality(EncoderQuality::Lossy(90)).unwrap();
    context.encode_image(&image, &mut encoder, None).unwrap();
    context.write_to_bytes().unwrap()
}

pub fn jpeg_dimensions(data: &[u8]) -> (u32, u32) {
    assert_eq!(image::guess_format(data).unwrap(), ImageFormat::Jpeg);
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}

#[derive(Default)]
pub struct InMemoryStorage {
    objects: HashMap<(String, String), Bytes>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, path: &str, data: Vec<u8>) -> Self {
        self.objects
            .insert((bucket.to_string(), path.to_string()), Bytes::from(data));
        self
    }

    /// Every download fails with a backend error
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn download_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(StorageError::Backend(message.clone()));
        }
        self.objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub status: Option<StatusCode>,
    pub headers: Vec<(HeaderName, String)>,
    pub body: Vec<u8>,
    pub ended: bool,
    pub aborted: bool,
    fail_next_head: bool,
    fail_chunks: bool,
}

impl RecordingSink {
    pub fn failing_first_head() -> Self {
        Self {
            fail_next_head: true,
            ..Self::default()
        }
    }

    /// Head succeeds but every body write fails
    pub fn failing_chunks() -> Self {
        Self {
            fail_chunks: true,
            ..Self::default()
        }
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn write_head(
        &mut self,
        status: StatusCode,
        headers: Vec<(HeaderName, String)>,
    ) -> io::Result<()> {
        if std::mem::take(&mut self.fail_next_head) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away"));
        }
        self.status = Some(status);
        self.headers = headers;
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        if self.fail_chunks {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn end(&mut self) -> io::Result<()> {
        self.ended = true;
        Ok(())
    }

    async fn abort(&mut self) {
        self.aborted = true;
    }
}
