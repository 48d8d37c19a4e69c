//! Store backend integration tests.
//!
//! Tests verify:
//! - Every in-process backend honours the same `BlobStore` contract
//! - A repository runs end to end over directory-backed tiers
//! - The bounded LRU cache tier evicts renditions under pressure

use std::sync::Arc;

use bytes::Bytes;

use image_repo::error::StoreError;
use image_repo::{BlobStore, LocalStore, LruStore, MemoryStore, Repository, ResizeMode, Variant};

use super::test_utils::{create_test_jpeg, dimensions};

// =============================================================================
// Shared Contract
// =============================================================================

async fn check_contract(store: &dyn BlobStore) {
    assert!(!store.exists("ns/a").await.unwrap());
    assert!(matches!(
        store.read("ns/a").await,
        Err(StoreError::NotFound(_))
    ));

    store
        .write("ns/a", Bytes::from_static(b"first"))
        .await
        .unwrap();
    assert!(store.exists("ns/a").await.unwrap());
    assert_eq!(store.read("ns/a").await.unwrap(), Bytes::from_static(b"first"));

    // Overwrite replaces the value
    store
        .write("ns/a", Bytes::from_static(b"second"))
        .await
        .unwrap();
    assert_eq!(
        store.read("ns/a").await.unwrap(),
        Bytes::from_static(b"second")
    );

    store.delete("ns/a").await.unwrap();
    assert!(!store.exists("ns/a").await.unwrap());
    assert!(matches!(
        store.delete("ns/a").await,
        Err(StoreError::NotFound(_))
    ));

    store.write("x", Bytes::from_static(b"1")).await.unwrap();
    store.write("y/z", Bytes::from_static(b"2")).await.unwrap();
    store.clear().await.unwrap();
    assert!(!store.exists("x").await.unwrap());
    assert!(!store.exists("y/z").await.unwrap());

    // Clearing an empty store is fine
    store.clear().await.unwrap();
    assert!(!store.identifier().is_empty());
}

#[tokio::test]
async fn test_memory_store_contract() {
    check_contract(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_lru_store_contract() {
    check_contract(&LruStore::new()).await;
}

#[tokio::test]
async fn test_local_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    check_contract(&LocalStore::new(dir.path().join("store"))).await;
}

// =============================================================================
// Directory-Backed Repository
// =============================================================================

#[tokio::test]
async fn test_repository_over_local_stores() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStore::new(dir.path().join("originals")));
    let cache = Arc::new(LocalStore::new(dir.path().join("cache")));
    let repo = Repository::new("avatars", storage.clone(), cache.clone()).unwrap();

    let upload = dir.path().join("upload.jpg");
    tokio::fs::write(&upload, create_test_jpeg(100, 50)).await.unwrap();

    let key = repo.put(&upload).await.unwrap();
    assert!(dir.path().join("originals").join(&key).is_file());

    let variant = Variant::resize(20, 20, ResizeMode::Fit);
    let rendition = repo.get(&key, &variant).await.unwrap();
    assert_eq!(dimensions(&rendition.data), (20, 10));
    assert!(dir
        .path()
        .join("cache")
        .join(rendition.cache_key.as_str())
        .is_file());

    let again = repo.get(&key, &variant).await.unwrap();
    assert!(again.cache_hit);

    repo.remove(&key).await.unwrap();
    assert!(!storage.exists(&key).await.unwrap());
    assert!(cache.exists(rendition.cache_key.as_str()).await.unwrap());

    repo.flush().await.unwrap();
    assert!(!cache.exists(rendition.cache_key.as_str()).await.unwrap());
}

#[tokio::test]
async fn test_local_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("originals");

    let key = {
        let repo = Repository::new(
            "",
            Arc::new(LocalStore::new(&root)),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        repo.put_bytes(create_test_jpeg(10, 10)).await.unwrap()
    };

    let reopened = Repository::new(
        "",
        Arc::new(LocalStore::new(&root)),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    let rendition = reopened.get(&key, &Variant::original()).await.unwrap();
    assert_eq!(dimensions(&rendition.data), (10, 10));
}

// =============================================================================
// Bounded Cache Tier
// =============================================================================

#[tokio::test]
async fn test_lru_cache_tier_evicts_old_renditions() {
    let cache = Arc::new(LruStore::with_capacity_and_entries(usize::MAX, 2));
    let repo = Repository::new("", Arc::new(MemoryStore::new()), cache.clone()).unwrap();
    let key = repo.put_bytes(create_test_jpeg(64, 64)).await.unwrap();

    let small = Variant::resize(8, 8, ResizeMode::Fit);
    let medium = Variant::resize(16, 16, ResizeMode::Fit);
    let large = Variant::resize(32, 32, ResizeMode::Fit);

    let first = repo.get(&key, &small).await.unwrap();
    repo.get(&key, &medium).await.unwrap();
    repo.get(&key, &large).await.unwrap();

    assert_eq!(cache.len().await, 2);
    assert!(!cache.exists(first.cache_key.as_str()).await.unwrap());

    // An evicted rendition is recomputed
    let again = repo.get(&key, &small).await.unwrap();
    assert!(!again.cache_hit);
    assert_eq!(again.data, first.data);
}
