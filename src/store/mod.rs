//! Blob storage layer.
//!
//! A [`BlobStore`] is a flat key/value byte store. The repository holds two of
//! them: a durable **storage** tier for originals and a **cache** tier for
//! derived renditions.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Repository                │
//! └──────────┬───────────────────┬──────────┘
//!            │                   │
//!            ▼                   ▼
//!   ┌─────────────────┐  ┌─────────────────┐
//!   │  storage tier   │  │   cache tier    │
//!   │   (originals)   │  │  (renditions)   │
//!   └─────────────────┘  └─────────────────┘
//!            │                   │
//!   ┌────────┴─────┬─────────────┴──┬──────────────┐
//!   ▼              ▼                ▼              ▼
//! MemoryStore   LruStore        LocalStore      S3Store
//! ```
//!
//! # Delete semantics
//!
//! Every backend in this module reports [`StoreError::NotFound`] when asked to
//! delete a key that does not exist, and treats `clear()` on an empty store as
//! a success.

mod local;
mod lru;
mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

pub use self::lru::{LruStore, DEFAULT_LRU_CAPACITY};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3::{create_s3_client, S3Store};

/// Key/value byte storage with existence checks.
///
/// Implementations must be thread-safe; the repository shares them behind
/// `Arc<dyn BlobStore>`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether an object is stored under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Read the full object stored under `key`.
    ///
    /// Returns [`StoreError::NotFound`] if the key is absent.
    async fn read(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Store `data` under `key`, replacing any previous object.
    async fn write(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Delete the object stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every object in the store.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Identifier for this store (for logging).
    fn identifier(&self) -> &str;
}
