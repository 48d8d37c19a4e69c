use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// How [`Image::resize`] maps the source onto the requested bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResizeMode {
    /// Preserve the aspect ratio and fit within the bounds.
    #[default]
    Fit,
    /// Stretch to exactly the requested size.
    Exact,
    /// Preserve the aspect ratio, cover the bounds and center-crop the overflow.
    Fill,
}

impl ResizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeMode::Fit => "fit",
            ResizeMode::Exact => "exact",
            ResizeMode::Fill => "fill",
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fit" => Ok(ResizeMode::Fit),
            "exact" => Ok(ResizeMode::Exact),
            "fill" => Ok(ResizeMode::Fill),
            other => Err(format!(
                "unknown resize mode '{}' (expected fit, exact or fill)",
                other
            )),
        }
    }
}

/// A decoded image.
///
/// Operations consume the image and hand back a new one, so a transform can be
/// written as a chain: `image.resize(500, 500, ResizeMode::Fit).grayscale()`.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: DynamicImage,
    format: ImageFormat,
}

impl Image {
    /// Wrap decoded pixels together with the format they should be encoded as.
    pub fn new(pixels: DynamicImage, format: ImageFormat) -> Self {
        Self { pixels, format }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    /// Format the image will be encoded as.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Resize to the given bounds.
    ///
    /// Zero-sized bounds are passed through; the resulting empty image is
    /// rejected when it is encoded.
    pub fn resize(self, width: u32, height: u32, mode: ResizeMode) -> Image {
        let pixels = match mode {
            ResizeMode::Fit => self.pixels.resize(width, height, FilterType::Lanczos3),
            ResizeMode::Exact => self.pixels.resize_exact(width, height, FilterType::Lanczos3),
            ResizeMode::Fill => self.pixels.resize_to_fill(width, height, FilterType::Lanczos3),
        };
        Image::new(pixels, self.format)
    }

    /// Crop a rectangle. The rectangle is clamped to the image bounds.
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Image {
        let pixels = self.pixels.crop_imm(x, y, width, height);
        Image::new(pixels, self.format)
    }

    pub fn grayscale(self) -> Image {
        let pixels = self.pixels.grayscale();
        Image::new(pixels, self.format)
    }

    /// Re-target the output format (e.g. serve PNG uploads as JPEG thumbnails).
    pub fn with_format(self, format: ImageFormat) -> Image {
        Image::new(self.pixels, format)
    }
}
