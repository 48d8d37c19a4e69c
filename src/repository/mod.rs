//! Image repository layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Repository                        │
//! │        put / get / remove / flush / store accessors      │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ get()
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                    TransformPipeline                     │
//! │  1. Validate key        5. Decode (ImageCodec)           │
//! │  2. Derive cache key    6. Apply transform               │
//! │  3. Check cache tier    7. Encode                        │
//! │  4. Load original       8. Write cache tier & return     │
//! └──────┬─────────────────────┬─────────────────────┬───────┘
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//!  │ storage tier│     │  cache tier  │     │  ImageCodec  │
//!  └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Components
//!
//! - [`Repository`]: facade owning both store tiers and the codec
//! - [`RepositoryBuilder`]: checked construction
//! - [`Variant`]: which rendition to serve (transform + cache name)
//! - [`Rendition`]: encoded bytes plus cache metadata
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use image_repo::codec::ResizeMode;
//! use image_repo::repository::{Repository, Variant};
//! use image_repo::store::{LruStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let repo = Repository::builder("profile-images")
//!         .storage(Arc::new(MemoryStore::new()))
//!         .cache(Arc::new(LruStore::new()))
//!         .build()
//!         .unwrap();
//!
//!     // An unknown key is reported as a missing image
//!     let err = repo
//!         .get("profile-images/unknown", &Variant::resize(150, 150, ResizeMode::Fit))
//!         .await
//!         .unwrap_err();
//!     assert!(err.is_missing_or_invalid());
//! }
//! ```

mod pipeline;
mod service;
mod variant;

pub use pipeline::TransformPipeline;
pub use service::{Repository, RepositoryBuilder};
pub use variant::{CacheNamerFn, Rendition, TransformFn, Variant};
