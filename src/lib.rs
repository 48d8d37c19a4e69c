//! # image-repo
//!
//! A content repository for images with a lazily computed rendition cache.
//!
//! Uploaded originals are stored durably under generated, namespaced keys.
//! On request, the repository serves either the original or a derived
//! rendition (a thumbnail, a crop, any caller-defined transform), computing
//! it on first use and caching it under a key derived from the original and
//! the transform's name.
//!
//! ## Features
//!
//! - **Two store tiers**: a durable storage tier for originals and a cache tier for renditions
//! - **Deterministic cache keys**: identical requests always land in the same cache slot
//! - **Namespaced keys**: repositories sharing a store cannot read each other's originals
//! - **Pluggable backends**: in-memory, bounded LRU, local directory and S3
//!
//! ## Architecture
//!
//! - [`store`] - `BlobStore` trait and backends
//! - [`codec`] - `ImageCodec` trait and the `image`-crate codec
//! - [`key`] - prefixes, image keys and cache key derivation
//! - [`repository`] - the `Repository` facade and rendition pipeline
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use image_repo::{LocalStore, LruStore, Repository, ResizeMode, Variant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = Repository::builder("profile-images")
//!         .storage(Arc::new(LocalStore::new("/var/lib/images")))
//!         .cache(Arc::new(LruStore::new()))
//!         .build()?;
//!
//!     let key = repo.put("avatar.jpg").await?;
//!     let thumb = repo.get(&key, &Variant::resize(150, 150, ResizeMode::Fit)).await?;
//!     println!("{} bytes (cache hit: {})", thumb.data.len(), thumb.cache_hit);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod repository;
pub mod store;

// Re-export commonly used types
pub use codec::{Image, ImageCodec, RasterCodec, ResizeMode};
pub use config::{Cli, Command, OutputFormat, RepoConfig, StoreLocation};
pub use error::{CodecError, RepositoryError, StoreError};
pub use key::{derive_cache_key, CacheKey, ImageKey, Prefix, TransformIdentity};
pub use repository::{Rendition, Repository, RepositoryBuilder, Variant};
pub use store::{create_s3_client, BlobStore, LocalStore, LruStore, MemoryStore, S3Store};
