use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::{Image, ResizeMode};
use crate::error::{CodecError, RepositoryError};
use crate::key::{CacheKey, TransformIdentity};

/// Caller-supplied transform applied to a decoded original.
pub type TransformFn = dyn Fn(Image) -> Result<Image, CodecError> + Send + Sync;

/// Caller-supplied function naming a transform's output.
pub type CacheNamerFn = dyn Fn() -> String + Send + Sync;

/// Which rendition of an original to serve.
///
/// A variant without a transform serves the original re-encoded (the
/// `default` rendition). A variant with a transform must also carry a cache
/// namer; the name it returns is what keeps two transforms from sharing a
/// cache slot, so it has to change whenever the transform's output would.
///
/// # Example
///
/// ```
/// use image_repo::codec::ResizeMode;
/// use image_repo::repository::Variant;
///
/// let thumb = Variant::transform(|image| Ok(image.resize(123, 321, ResizeMode::Fit)))
///     .named(|| "123x123".to_string());
/// assert!(thumb.has_transform());
///
/// // Equivalent shorthand, named "123x321-fit"
/// let thumb = Variant::resize(123, 321, ResizeMode::Fit);
/// ```
#[derive(Clone, Default)]
pub struct Variant {
    transform: Option<Arc<TransformFn>>,
    namer: Option<Arc<CacheNamerFn>>,
}

impl Variant {
    /// The original image, re-encoded.
    pub fn original() -> Self {
        Self::default()
    }

    /// A custom transform. Must be followed by [`named`](Self::named).
    pub fn transform<F>(transform: F) -> Self
    where
        F: Fn(Image) -> Result<Image, CodecError> + Send + Sync + 'static,
    {
        Self {
            transform: Some(Arc::new(transform)),
            namer: None,
        }
    }

    /// Attach the cache namer. It is called with no arguments on every `get`.
    pub fn named<G>(mut self, namer: G) -> Self
    where
        G: Fn() -> String + Send + Sync + 'static,
    {
        self.namer = Some(Arc::new(namer));
        self
    }

    /// Attach a fixed cache name.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.named(move || name.clone())
    }

    /// Resize to the given bounds, named `{width}x{height}-{mode}`.
    pub fn resize(width: u32, height: u32, mode: ResizeMode) -> Self {
        Self::transform(move |image| Ok(image.resize(width, height, mode)))
            .with_name(format!("{}x{}-{}", width, height, mode))
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    /// Resolve the transform identity.
    ///
    /// Without a transform the identity is always `default`, whatever the
    /// namer says. A transform without a namer is rejected.
    pub(crate) fn identity(&self) -> Result<TransformIdentity, RepositoryError> {
        match (&self.transform, &self.namer) {
            (None, _) => Ok(TransformIdentity::Default),
            (Some(_), Some(namer)) => Ok(TransformIdentity::named(namer())),
            (Some(_), None) => Err(RepositoryError::InvalidInput(
                "a transform requires a cache namer".to_string(),
            )),
        }
    }

    /// Run the transform, or pass the image through untouched.
    pub(crate) fn apply(&self, image: Image) -> Result<Image, CodecError> {
        match &self.transform {
            Some(transform) => transform(image),
            None => Ok(image),
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("transform", &self.transform.is_some())
            .field("namer", &self.namer.is_some())
            .finish()
    }
}

/// An encoded rendition served by the repository.
#[derive(Debug, Clone)]
pub struct Rendition {
    /// The encoded image
    pub data: Bytes,

    /// Where the rendition lives in the cache tier
    pub cache_key: CacheKey,

    /// Whether this rendition was served from the cache tier
    pub cache_hit: bool,
}
