//! Repository facade integration tests.
//!
//! Tests verify:
//! - Construction fails without both store tiers
//! - Store tier accessors and setters
//! - Uploading originals in every supported format
//! - Namespace isolation between prefixes
//! - Removing originals and flushing the cache tier

use std::sync::Arc;

use bytes::Bytes;

use image_repo::error::{RepositoryError, StoreError};
use image_repo::{BlobStore, MemoryStore, Repository, Variant};

use super::test_utils::{
    create_test_gif, create_test_jpeg, create_test_png, is_valid_gif, is_valid_jpeg,
    is_valid_png, FailingStore, TestRepo, TrackingStore,
};

fn memory() -> Arc<dyn BlobStore> {
    Arc::new(MemoryStore::new())
}

async fn write_temp(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    tokio::fs::write(&path, data).await.unwrap();
    path
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_missing_storage_is_configuration_error() {
    let result = Repository::builder("").cache(memory()).build();
    assert!(matches!(result, Err(RepositoryError::Configuration(_))));
}

#[test]
fn test_missing_cache_is_configuration_error() {
    let result = Repository::builder("").storage(memory()).build();
    assert!(matches!(result, Err(RepositoryError::Configuration(_))));
}

#[test]
fn test_missing_both_tiers_is_configuration_error() {
    let result = Repository::builder("images").build();
    assert!(matches!(result, Err(RepositoryError::Configuration(_))));
}

#[test]
fn test_store_getters_and_setters() {
    let storage = memory();
    let cache = memory();
    let mut repo = Repository::new("", storage.clone(), cache.clone()).unwrap();

    assert!(Arc::ptr_eq(repo.storage(), &storage));
    assert!(Arc::ptr_eq(repo.cache(), &cache));

    let new_storage = memory();
    let new_cache = memory();
    repo.set_storage(new_storage.clone());
    repo.set_cache(new_cache.clone());

    assert!(Arc::ptr_eq(repo.storage(), &new_storage));
    assert!(Arc::ptr_eq(repo.cache(), &new_cache));
    assert!(!Arc::ptr_eq(repo.storage(), &storage));
}

// =============================================================================
// Put
// =============================================================================

#[tokio::test]
async fn test_put_empty_path_is_invalid_input() {
    let fixture = TestRepo::new("");
    let result = fixture.repo.put("").await;

    assert!(matches!(result, Err(RepositoryError::InvalidInput(_))));
    assert_eq!(fixture.storage.write_count(), 0);
}

#[tokio::test]
async fn test_put_unreadable_path_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestRepo::new("");

    let result = fixture.repo.put(dir.path().join("nope.jpg")).await;
    assert!(matches!(result, Err(RepositoryError::InvalidInput(_))));
    assert_eq!(fixture.storage.write_count(), 0);
}

#[tokio::test]
async fn test_put_empty_file_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp(&dir, "empty.jpg", b"").await;
    let fixture = TestRepo::new("");

    let result = fixture.repo.put(&path).await;
    assert!(matches!(result, Err(RepositoryError::InvalidInput(_))));
    assert_eq!(fixture.storage.len().await, 0);
}

#[tokio::test]
async fn test_put_supported_formats() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestRepo::new("uploads");

    let files = [
        ("a.jpg", create_test_jpeg(32, 16)),
        ("b.png", create_test_png(32, 16)),
        ("c.gif", create_test_gif(32, 16)),
    ];

    for (name, data) in files {
        let path = write_temp(&dir, name, &data).await;
        let key = fixture.repo.put(&path).await.unwrap();

        assert!(!key.is_empty());
        assert!(key.starts_with("uploads/"));
        assert!(fixture.repo.exists(&key).await.unwrap());

        // The original is stored byte-for-byte
        let stored = fixture.storage.read(&key).await.unwrap();
        assert_eq!(stored, data);
    }

    assert_eq!(fixture.storage.len().await, 3);
}

#[tokio::test]
async fn test_put_generates_distinct_keys() {
    let fixture = TestRepo::new("");
    let data = create_test_jpeg(8, 8);

    let a = fixture.repo.put_bytes(data.clone()).await.unwrap();
    let b = fixture.repo.put_bytes(data).await.unwrap();

    assert_ne!(a, b);
    assert!(!a.contains('/'));
    assert_eq!(fixture.storage.len().await, 2);
}

#[tokio::test]
async fn test_put_propagates_storage_failure() {
    let repo = Repository::new("", Arc::new(FailingStore::new()), memory()).unwrap();

    let result = repo.put_bytes(create_test_jpeg(8, 8)).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::Io(_)))
    ));
}

#[tokio::test]
async fn test_put_and_get_each_format() {
    let fixture = TestRepo::new("");

    let jpeg = fixture.repo.put_bytes(create_test_jpeg(20, 10)).await.unwrap();
    let png = fixture.repo.put_bytes(create_test_png(20, 10)).await.unwrap();
    let gif = fixture.repo.put_bytes(create_test_gif(20, 10)).await.unwrap();

    let original = Variant::original();
    let jpeg = fixture.repo.get(&jpeg, &original).await.unwrap();
    let png = fixture.repo.get(&png, &original).await.unwrap();
    let gif = fixture.repo.get(&gif, &original).await.unwrap();

    assert!(is_valid_jpeg(&jpeg.data));
    assert!(is_valid_png(&png.data));
    assert!(is_valid_gif(&gif.data));
}

// =============================================================================
// Namespaces
// =============================================================================

#[tokio::test]
async fn test_invalid_key_is_missing_or_invalid() {
    let fixture = TestRepo::new("");
    let result = fixture.repo.get("not-a-key", &Variant::original()).await;

    let err = result.unwrap_err();
    assert!(err.is_missing_or_invalid());
    assert_eq!(fixture.cache.write_count(), 0);
}

#[tokio::test]
async fn test_wrong_prefix_fails() {
    let storage = Arc::new(TrackingStore::new());
    let cache = memory();
    let owner = Repository::new("alpha", storage.clone(), cache.clone()).unwrap();
    let other = Repository::new("beta", storage.clone(), cache).unwrap();

    let key = owner.put_bytes(create_test_jpeg(8, 8)).await.unwrap();

    let result = other.get(&key, &Variant::original()).await;
    assert!(matches!(
        result,
        Err(RepositoryError::ImageMissingOrInvalid(_))
    ));
    assert!(!other.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_nested_prefix_does_not_own_parent_keys() {
    let storage = memory();
    let parent = Repository::new("a", storage.clone(), memory()).unwrap();
    let child = Repository::new("a/b", storage, memory()).unwrap();

    let key = parent.put_bytes(create_test_jpeg(8, 8)).await.unwrap();
    assert!(child.get(&key, &Variant::original()).await.is_err());

    let key = child.put_bytes(create_test_jpeg(8, 8)).await.unwrap();
    assert!(key.starts_with("a/b/"));
    assert!(parent.get(&key, &Variant::original()).await.is_err());
}

#[tokio::test]
async fn test_right_prefix_succeeds() {
    let (fixture, key) = TestRepo::with_jpeg("gallery", 16, 16).await;

    let rendition = fixture.repo.get(&key, &Variant::original()).await.unwrap();
    assert!(!rendition.data.is_empty());
    assert!(is_valid_jpeg(&rendition.data));
}

// =============================================================================
// Remove and Flush
// =============================================================================

#[tokio::test]
async fn test_remove_missing_key_is_not_found() {
    let fixture = TestRepo::new("");
    let result = fixture.repo.remove("does-not-exist").await;

    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_remove_existing_original() {
    let (fixture, key) = TestRepo::with_jpeg("", 8, 8).await;

    fixture.repo.remove(&key).await.unwrap();

    assert!(!fixture.repo.exists(&key).await.unwrap());
    let result = fixture.repo.get(&key, &Variant::original()).await;
    assert!(result.unwrap_err().is_missing_or_invalid());
}

#[tokio::test]
async fn test_remove_leaves_cached_renditions() {
    let (fixture, key) = TestRepo::with_jpeg("", 8, 8).await;
    let rendition = fixture.repo.get(&key, &Variant::original()).await.unwrap();

    fixture.repo.remove(&key).await.unwrap();

    assert!(fixture
        .cache
        .exists(rendition.cache_key.as_str())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_remove_propagates_storage_failure() {
    let repo = Repository::new("", Arc::new(FailingStore::new()), memory()).unwrap();
    let result = repo.remove("anything").await;

    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::Io(_)))
    ));
}

#[tokio::test]
async fn test_flush_clears_cache_only() {
    let (fixture, key) = TestRepo::with_jpeg("", 16, 16).await;
    fixture.repo.get(&key, &Variant::original()).await.unwrap();
    assert_eq!(fixture.cache.len().await, 1);

    fixture.repo.flush().await.unwrap();

    assert_eq!(fixture.cache.len().await, 0);
    assert!(fixture.repo.exists(&key).await.unwrap());

    let again = fixture.repo.get(&key, &Variant::original()).await.unwrap();
    assert!(!again.cache_hit);
}

#[tokio::test]
async fn test_flush_empty_cache_succeeds() {
    let fixture = TestRepo::new("");
    fixture.repo.flush().await.unwrap();
}

#[tokio::test]
async fn test_flush_propagates_cache_failure() {
    let repo = Repository::new("", memory(), Arc::new(FailingStore::new())).unwrap();
    let result = repo.flush().await;

    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::Io(_)))
    ));
}

#[tokio::test]
async fn test_set_cache_redirects_renditions() {
    let (mut fixture, key) = TestRepo::with_jpeg("", 8, 8).await;
    let replacement = TrackingStore::new();
    fixture.repo.set_cache(Arc::new(replacement.clone()));

    let rendition = fixture.repo.get(&key, &Variant::original()).await.unwrap();

    assert!(!rendition.cache_hit);
    assert_eq!(fixture.cache.write_count(), 0);
    assert_eq!(replacement.write_count(), 1);
    assert_eq!(
        replacement.read(rendition.cache_key.as_str()).await.unwrap(),
        rendition.data
    );
}

#[tokio::test]
async fn test_put_bytes_rejects_empty_data() {
    let fixture = TestRepo::new("");
    let result = fixture.repo.put_bytes(Bytes::new()).await;

    assert!(matches!(result, Err(RepositoryError::InvalidInput(_))));
}

#[tokio::test]
async fn test_unmintable_keys_are_missing_or_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(image_repo::LocalStore::new(dir.path().join("originals")));

    let scoped = Repository::new("imgs", storage.clone(), memory()).unwrap();
    for key in ["imgs/..", "imgs/.", "/imgs/x"] {
        let result = scoped.get(key, &Variant::original()).await;
        assert!(
            matches!(result, Err(RepositoryError::ImageMissingOrInvalid(_))),
            "get({:?}) returned {:?}",
            key,
            result
        );
        assert!(matches!(
            scoped.remove(key).await,
            Err(RepositoryError::ImageMissingOrInvalid(_))
        ));
    }

    let unscoped = Repository::new("", storage, memory()).unwrap();
    for key in ["..", ".", "/x", "a\\b"] {
        let result = unscoped.get(key, &Variant::original()).await;
        assert!(
            matches!(result, Err(RepositoryError::ImageMissingOrInvalid(_))),
            "get({:?}) returned {:?}",
            key,
            result
        );
        assert!(!unscoped.exists(key).await.unwrap());
    }
}
