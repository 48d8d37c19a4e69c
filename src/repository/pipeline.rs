//! Lazy rendition pipeline.
//!
//! One `run` walks a single request through the state machine:
//!
//! ```text
//! VALIDATE_KEY → DERIVE_CACHE_KEY → CHECK_CACHE ─ hit ──────────────────────────────▶ RETURN
//!                                        └─ miss → LOAD → DECODE → TRANSFORM → ENCODE → WRITE_CACHE → RETURN
//! ```
//!
//! The original is never loaded or decoded on a cache hit. Two concurrent
//! misses for the same cache key may both compute and both write; the
//! rendition is a pure function of its inputs, so the last write stores the
//! same bytes as the first.

use std::io::ErrorKind;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::codec::ImageCodec;
use crate::error::{RepositoryError, StoreError};
use crate::key::{derive_cache_key, CacheKey, ImageKey, Prefix};
use crate::store::BlobStore;

use super::variant::{Rendition, Variant};

/// Borrowed view of a repository's collaborators for one `get`.
pub struct TransformPipeline<'a> {
    prefix: &'a Prefix,
    storage: &'a dyn BlobStore,
    cache: &'a dyn BlobStore,
    codec: &'a dyn ImageCodec,
}

impl<'a> TransformPipeline<'a> {
    pub fn new(
        prefix: &'a Prefix,
        storage: &'a dyn BlobStore,
        cache: &'a dyn BlobStore,
        codec: &'a dyn ImageCodec,
    ) -> Self {
        Self {
            prefix,
            storage,
            cache,
            codec,
        }
    }

    /// Compute the cache key for a request without any I/O.
    ///
    /// Fails with `InvalidInput` when the variant has a transform but no namer.
    pub fn cache_key(&self, key: &ImageKey, variant: &Variant) -> Result<CacheKey, RepositoryError> {
        let identity = variant.identity()?;
        Ok(derive_cache_key(key, &identity))
    }

    /// Serve a rendition, computing and caching it on a miss.
    pub async fn run(&self, key: &ImageKey, variant: &Variant) -> Result<Rendition, RepositoryError> {
        // Resolve the identity first so a malformed variant never touches a store
        let identity = variant.identity()?;

        self.validate_key(key).await?;

        let cache_key = derive_cache_key(key, &identity);

        if let Some(data) = self.cached(&cache_key).await? {
            debug!(key = %key, identity = %identity, cache_key = %cache_key, "rendition cache hit");
            return Ok(Rendition {
                data,
                cache_key,
                cache_hit: true,
            });
        }

        debug!(key = %key, identity = %identity, cache_key = %cache_key, "rendition cache miss");

        let original = self.load(key).await?;

        let image = self
            .codec
            .decode(&original)
            .map_err(|e| RepositoryError::ImageMissingOrInvalid(format!("{}: {}", key, e)))?;

        let image = variant.apply(image)?;
        let data = self.codec.encode(&image)?;

        // The rendition is still served if caching it fails
        if let Err(e) = self.cache.write(cache_key.as_str(), data.clone()).await {
            warn!(
                cache = self.cache.identifier(),
                cache_key = %cache_key,
                error = %e,
                "failed to cache rendition"
            );
        }

        Ok(Rendition {
            data,
            cache_key,
            cache_hit: false,
        })
    }

    async fn validate_key(&self, key: &ImageKey) -> Result<(), RepositoryError> {
        match key {
            ImageKey::Store(store_key) => {
                if !self.prefix.owns(store_key) {
                    return Err(RepositoryError::ImageMissingOrInvalid(format!(
                        "{} is not in namespace '{}'",
                        store_key, self.prefix
                    )));
                }
                if !self.storage.exists(store_key).await? {
                    return Err(RepositoryError::ImageMissingOrInvalid(format!(
                        "{} not found in {}",
                        store_key,
                        self.storage.identifier()
                    )));
                }
                Ok(())
            }
            ImageKey::LocalPath(path) => match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => Ok(()),
                Ok(_) => Err(missing_local(path, "not a file")),
                Err(e) => Err(missing_local(path, &e.to_string())),
            },
        }
    }

    /// Read the cache tier. An entry evicted between `exists` and `read`
    /// counts as a miss.
    async fn cached(&self, cache_key: &CacheKey) -> Result<Option<Bytes>, RepositoryError> {
        if !self.cache.exists(cache_key.as_str()).await? {
            return Ok(None);
        }
        match self.cache.read(cache_key.as_str()).await {
            Ok(data) => Ok(Some(data)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, key: &ImageKey) -> Result<Bytes, RepositoryError> {
        match key {
            ImageKey::Store(store_key) => match self.storage.read(store_key).await {
                Ok(data) => Ok(data),
                Err(StoreError::NotFound(_)) => Err(RepositoryError::ImageMissingOrInvalid(
                    format!("{} was removed", store_key),
                )),
                Err(e) => Err(e.into()),
            },
            ImageKey::LocalPath(path) => match tokio::fs::read(path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(missing_local(path, "was removed")),
                Err(e) => Err(missing_local(path, &e.to_string())),
            },
        }
    }
}

fn missing_local(path: &Path, reason: &str) -> RepositoryError {
    RepositoryError::ImageMissingOrInvalid(format!("{}: {}", path.display(), reason))
}
