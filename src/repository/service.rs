use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::codec::{ImageCodec, RasterCodec};
use crate::error::{RepositoryError, StoreError};
use crate::key::{CacheKey, ImageKey, Prefix};
use crate::store::BlobStore;

use super::pipeline::TransformPipeline;
use super::variant::{Rendition, Variant};

/// Attempts at minting a storage key that is not already taken.
const MAX_KEY_ATTEMPTS: usize = 3;

// =============================================================================
// Repository
// =============================================================================

/// Content repository for images with a lazily populated rendition cache.
///
/// Originals are written to the storage tier under freshly generated,
/// prefix-qualified keys. Renditions (the re-encoded original, thumbnails,
/// custom transforms) are computed on first request and kept in the cache
/// tier.
///
/// The repository is `Send + Sync`; share it behind an `Arc` to serve
/// concurrent requests. Swapping a store tier needs `&mut self`, so callers
/// sharing a repository must serialize swaps themselves.
///
/// # Example
///
/// ```ignore
/// let repo = Repository::builder("profile-images")
///     .storage(Arc::new(LocalStore::new("/var/lib/images/originals")))
///     .cache(Arc::new(LocalStore::new("/var/cache/images")))
///     .build()?;
///
/// let key = repo.put("upload.jpg").await?;
/// let thumb = repo.get(&key, &Variant::resize(150, 150, ResizeMode::Fit)).await?;
/// println!("{} bytes, cache hit: {}", thumb.data.len(), thumb.cache_hit);
/// ```
pub struct Repository {
    prefix: Prefix,
    storage: Arc<dyn BlobStore>,
    cache: Arc<dyn BlobStore>,
    codec: Arc<dyn ImageCodec>,
}

impl Repository {
    /// Start building a repository for the given prefix.
    pub fn builder(prefix: impl Into<String>) -> RepositoryBuilder {
        RepositoryBuilder::new(prefix)
    }

    /// Create a repository with the default codec.
    ///
    /// Fails with `Configuration` if the prefix is malformed.
    pub fn new(
        prefix: impl Into<String>,
        storage: Arc<dyn BlobStore>,
        cache: Arc<dyn BlobStore>,
    ) -> Result<Self, RepositoryError> {
        Self::builder(prefix).storage(storage).cache(cache).build()
    }

    // =========================================================================
    // Originals
    // =========================================================================

    /// Store the file at `path` as a new original and return its key.
    ///
    /// Fails with `InvalidInput` if the path is empty, unreadable or the file
    /// is empty; nothing is written in that case.
    pub async fn put(&self, path: impl AsRef<Path>) -> Result<String, RepositoryError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(RepositoryError::InvalidInput("no file given".to_string()));
        }

        let data = tokio::fs::read(path).await.map_err(|e| {
            RepositoryError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;

        self.put_bytes(Bytes::from(data)).await
    }

    /// Store `data` as a new original and return its key.
    pub async fn put_bytes(&self, data: Bytes) -> Result<String, RepositoryError> {
        if data.is_empty() {
            return Err(RepositoryError::InvalidInput("image data is empty".to_string()));
        }

        let key = self.allocate_key().await?;
        let size = data.len();
        self.storage.write(&key, data).await?;

        info!(key = %key, bytes = size, storage = self.storage.identifier(), "stored original");
        Ok(key)
    }

    async fn allocate_key(&self) -> Result<String, RepositoryError> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = self.prefix.generate_key();
            if !self.storage.exists(&key).await? {
                return Ok(key);
            }
            debug!(key = %key, "generated key already taken, retrying");
        }
        Err(StoreError::Io(format!(
            "could not allocate a free key under '{}' after {} attempts",
            self.prefix, MAX_KEY_ATTEMPTS
        ))
        .into())
    }

    /// Whether `key` names an original stored under this repository's prefix.
    ///
    /// Does not decode the original.
    pub async fn exists(&self, key: &str) -> Result<bool, RepositoryError> {
        if !self.prefix.owns(key) {
            return Ok(false);
        }
        Ok(self.storage.exists(key).await?)
    }

    /// Delete an original from the storage tier.
    ///
    /// Cached renditions of it are left in place until the next [`flush`].
    /// Fails with `ImageMissingOrInvalid` for keys outside this prefix;
    /// otherwise the storage tier's outcome is returned as-is.
    ///
    /// [`flush`]: Self::flush
    pub async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        if !self.prefix.owns(key) {
            return Err(RepositoryError::ImageMissingOrInvalid(format!(
                "{} is not in namespace '{}'",
                key, self.prefix
            )));
        }

        self.storage.delete(key).await?;
        info!(key = %key, storage = self.storage.identifier(), "removed original");
        Ok(())
    }

    // =========================================================================
    // Renditions
    // =========================================================================

    /// Serve a rendition of `key`, computing and caching it on first request.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the variant has a transform but no cache namer
    /// - `ImageMissingOrInvalid` if the key is outside this prefix, missing,
    ///   or does not decode as an image
    /// - `Codec` if the transform fails or its output cannot be encoded
    /// - `Store` if a store tier fails on a read
    pub async fn get(
        &self,
        key: impl Into<ImageKey>,
        variant: &Variant,
    ) -> Result<Rendition, RepositoryError> {
        let key = key.into();
        self.pipeline().run(&key, variant).await
    }

    /// The cache key `get` would use for this request, without any I/O.
    pub fn cache_key(
        &self,
        key: impl Into<ImageKey>,
        variant: &Variant,
    ) -> Result<CacheKey, RepositoryError> {
        let key = key.into();
        self.pipeline().cache_key(&key, variant)
    }

    /// Drop every rendition in the cache tier.
    ///
    /// The cache tier may be shared, so this also clears renditions cached by
    /// repositories with other prefixes.
    pub async fn flush(&self) -> Result<(), RepositoryError> {
        self.cache.clear().await?;
        info!(cache = self.cache.identifier(), "flushed rendition cache");
        Ok(())
    }

    fn pipeline(&self) -> TransformPipeline<'_> {
        TransformPipeline::new(
            &self.prefix,
            self.storage.as_ref(),
            self.cache.as_ref(),
            self.codec.as_ref(),
        )
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn storage(&self) -> &Arc<dyn BlobStore> {
        &self.storage
    }

    pub fn cache(&self) -> &Arc<dyn BlobStore> {
        &self.cache
    }

    pub fn codec(&self) -> &Arc<dyn ImageCodec> {
        &self.codec
    }

    pub fn set_storage(&mut self, storage: Arc<dyn BlobStore>) {
        debug!(storage = storage.identifier(), "storage tier replaced");
        self.storage = storage;
    }

    pub fn set_cache(&mut self, cache: Arc<dyn BlobStore>) {
        debug!(cache = cache.identifier(), "cache tier replaced");
        self.cache = cache;
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Repository`].
///
/// Both store tiers are required; the codec defaults to [`RasterCodec`].
pub struct RepositoryBuilder {
    prefix: String,
    storage: Option<Arc<dyn BlobStore>>,
    cache: Option<Arc<dyn BlobStore>>,
    codec: Option<Arc<dyn ImageCodec>>,
}

impl RepositoryBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            storage: None,
            cache: None,
            codec: None,
        }
    }

    /// Durable tier for originals.
    pub fn storage(mut self, storage: Arc<dyn BlobStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Tier for computed renditions.
    pub fn cache(mut self, cache: Arc<dyn BlobStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Build the repository.
    ///
    /// Fails with `Configuration` if a store tier is missing or the prefix is
    /// malformed.
    pub fn build(self) -> Result<Repository, RepositoryError> {
        let storage = self.storage.ok_or_else(|| {
            RepositoryError::Configuration("a storage store is required".to_string())
        })?;
        let cache = self.cache.ok_or_else(|| {
            RepositoryError::Configuration("a cache store is required".to_string())
        })?;
        let prefix = Prefix::new(self.prefix)?;
        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(RasterCodec::default()));

        debug!(
            prefix = %prefix,
            storage = storage.identifier(),
            cache = cache.identifier(),
            "repository created"
        );

        Ok(Repository {
            prefix,
            storage,
            cache,
            codec,
        })
    }
}
