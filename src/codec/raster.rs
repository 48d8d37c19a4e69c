//! Default codec built on the `image` crate.
//!
//! # Design Decisions
//!
//! - **Format follows the image**: an image is encoded in the format it was
//!   decoded from unless a transform re-targets it with [`Image::with_format`].
//!
//! - **Quality control**: JPEG output uses one quality setting per codec, so
//!   all renditions served by a repository are encoded consistently.
//!
//! - **No alpha in JPEG**: images with an alpha channel are flattened to RGB
//!   before JPEG encoding.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{Image, ImageCodec};
use crate::error::CodecError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Formats this codec decodes and encodes.
const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// Raster image codec for JPEG, PNG and GIF.
///
/// # Example
///
/// ```ignore
/// use image_repo::codec::{ImageCodec, RasterCodec, ResizeMode};
///
/// let codec = RasterCodec::with_quality(85);
/// let image = codec.decode(&source_bytes)?;
/// let thumbnail = codec.encode(&image.resize(150, 150, ResizeMode::Fit))?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    jpeg_quality: u8,
}

impl RasterCodec {
    /// Create a codec with the default JPEG quality.
    pub fn new() -> Self {
        Self::with_quality(DEFAULT_JPEG_QUALITY)
    }

    /// Create a codec with the given JPEG quality, clamped to 1-100.
    pub fn with_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: clamp_quality(quality),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Get image dimensions without fully decoding.
    ///
    /// # Returns
    ///
    /// `(width, height)` in pixels.
    pub fn dimensions(&self, data: &[u8]) -> Result<(u32, u32), CodecError> {
        let format = detect_format(data)?;
        ImageReader::with_format(Cursor::new(data), format)
            .into_dimensions()
            .map_err(|e| CodecError::Decode {
                message: e.to_string(),
            })
    }
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, data: &[u8]) -> Result<Image, CodecError> {
        let format = detect_format(data)?;
        let pixels = ImageReader::with_format(Cursor::new(data), format)
            .decode()
            .map_err(|e| CodecError::Decode {
                message: e.to_string(),
            })?;

        Ok(Image::new(pixels, format))
    }

    fn encode(&self, image: &Image) -> Result<Bytes, CodecError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CodecError::Encode {
                message: format!("image has no pixels ({}x{})", width, height),
            });
        }

        let mut output = Vec::new();
        match image.format() {
            ImageFormat::Jpeg => {
                let pixels = match image.pixels() {
                    DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.pixels().clone(),
                    other => DynamicImage::ImageRgb8(other.to_rgb8()),
                };
                let mut encoder = JpegEncoder::new_with_quality(&mut output, self.jpeg_quality);
                encoder
                    .encode_image(&pixels)
                    .map_err(|e| CodecError::Encode {
                        message: e.to_string(),
                    })?;
            }
            ImageFormat::Png => {
                image
                    .pixels()
                    .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
                    .map_err(|e| CodecError::Encode {
                        message: e.to_string(),
                    })?;
            }
            ImageFormat::Gif => {
                let pixels = DynamicImage::ImageRgba8(image.pixels().to_rgba8());
                pixels
                    .write_to(&mut Cursor::new(&mut output), ImageFormat::Gif)
                    .map_err(|e| CodecError::Encode {
                        message: e.to_string(),
                    })?;
            }
            other => {
                return Err(CodecError::Encode {
                    message: format!("unsupported output format {:?}", other),
                });
            }
        }

        Ok(Bytes::from(output))
    }
}

/// Sniff the format from magic bytes and make sure this codec handles it.
fn detect_format(data: &[u8]) -> Result<ImageFormat, CodecError> {
    if data.is_empty() {
        return Err(CodecError::Decode {
            message: "empty input".to_string(),
        });
    }

    let format = image::guess_format(data).map_err(|e| CodecError::Decode {
        message: e.to_string(),
    })?;

    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(CodecError::Decode {
            message: format!("unsupported image format {:?}", format),
        });
    }

    Ok(format)
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
