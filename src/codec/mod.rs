//! Image codec layer.
//!
//! The repository never touches pixel data itself. It hands stored bytes to
//! an [`ImageCodec`] to obtain an [`Image`], lets the caller's transform
//! reshape it, and asks the codec to serialize the result again.
//!
//! # Components
//!
//! - [`ImageCodec`]: decode/encode capability, resolved once per repository
//! - [`Image`]: owned decoded bitmap that remembers its source format
//! - [`ResizeMode`]: how [`Image::resize`] treats the aspect ratio
//! - [`RasterCodec`]: default codec built on the `image` crate (JPEG, PNG, GIF)

mod decoded;
mod raster;

use bytes::Bytes;

use crate::error::CodecError;

pub use decoded::{Image, ResizeMode};
pub use raster::{
    clamp_quality, is_valid_quality, RasterCodec, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY,
    MIN_JPEG_QUALITY,
};

/// Decode/encode capability used by the repository.
pub trait ImageCodec: Send + Sync {
    /// Decode raw bytes into an image.
    ///
    /// Returns [`CodecError::Decode`] if the bytes are not a supported image.
    fn decode(&self, data: &[u8]) -> Result<Image, CodecError>;

    /// Serialize an image in its own format.
    fn encode(&self, image: &Image) -> Result<Bytes, CodecError>;
}
