//! Keys and cache key derivation.
//!
//! - [`Prefix`]: namespace a repository mints its storage keys under
//! - [`ImageKey`]: what a caller asks for, either a stored original or a local file
//! - [`TransformIdentity`]: names one rendition of an original
//! - [`CacheKey`]: where that rendition lives in the cache tier
//!
//! # Storage keys
//!
//! Storage keys are `{prefix}/{uuid}` (or a bare `{uuid}` under the empty
//! prefix). The namespace of a key is everything before its last `/`; a
//! repository only accepts keys whose namespace equals its own prefix.
//!
//! # Cache keys
//!
//! A cache key is the SHA-256 of the source and the transform identity, each
//! length-prefixed so that no two distinct pairs serialize to the same input:
//!
//! ```text
//! sha256("image-repo/v1" ‖ len(source) ‖ source ‖ len(identity) ‖ identity)
//!   → "ab/ab34…"   (first byte as a fan-out directory, then the full digest)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::RepositoryError;

/// Domain tag mixed into every cache key digest.
const CACHE_KEY_DOMAIN: &[u8] = b"image-repo/v1";

/// Identity used when no transform is requested.
pub const DEFAULT_IDENTITY: &str = "default";

// =============================================================================
// Prefix
// =============================================================================

/// Namespace partition owned by one repository.
///
/// May be empty. A non-empty prefix must not start or end with `/` and must
/// not contain empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Prefix(String);

impl Prefix {
    pub fn new(prefix: impl Into<String>) -> Result<Self, RepositoryError> {
        let prefix = prefix.into();
        if !prefix.is_empty()
            && (prefix.contains('\\')
                || prefix
                    .split('/')
                    .any(|segment| segment.is_empty() || segment == "." || segment == ".."))
        {
            return Err(RepositoryError::Configuration(format!(
                "invalid prefix '{}'",
                prefix
            )));
        }
        Ok(Self(prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mint a fresh storage key under this prefix.
    ///
    /// Keys are random rather than content-derived, so uploading the same
    /// bytes twice yields two independently removable originals.
    pub fn generate_key(&self) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        if self.0.is_empty() {
            id
        } else {
            format!("{}/{}", self.0, id)
        }
    }

    /// Whether `key` was minted under this prefix.
    ///
    /// Keys that could not have been minted are never owned: a leading `/`,
    /// any backslash, or a final segment of `.` or `..`.
    pub fn owns(&self, key: &str) -> bool {
        if key.starts_with('/') || key.contains('\\') {
            return false;
        }
        let (namespace, name) = match key.rfind('/') {
            Some(idx) => (&key[..idx], &key[idx + 1..]),
            None => ("", key),
        };
        !name.is_empty() && name != "." && name != ".." && namespace == self.0
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ImageKey
// =============================================================================

/// Source of an original image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageKey {
    /// A key in the storage tier, subject to the prefix check.
    Store(String),

    /// A file on local disk, read directly and never prefix-checked.
    LocalPath(PathBuf),
}

impl ImageKey {
    pub fn store(key: impl Into<String>) -> Self {
        ImageKey::Store(key.into())
    }

    pub fn local(path: impl AsRef<Path>) -> Self {
        ImageKey::LocalPath(path.as_ref().to_path_buf())
    }

    /// Bytes fed into cache key derivation.
    ///
    /// Local paths are tagged so that a path can never alias a store key, and
    /// hashed as raw OS bytes so that non-UTF-8 paths stay distinct.
    fn source_id(&self) -> Vec<u8> {
        match self {
            ImageKey::Store(key) => key.as_bytes().to_vec(),
            ImageKey::LocalPath(path) => {
                let mut id = b"local:".to_vec();
                id.extend_from_slice(path.as_os_str().as_encoded_bytes());
                id
            }
        }
    }
}

impl From<&str> for ImageKey {
    fn from(key: &str) -> Self {
        ImageKey::Store(key.to_string())
    }
}

impl From<String> for ImageKey {
    fn from(key: String) -> Self {
        ImageKey::Store(key)
    }
}

impl From<&String> for ImageKey {
    fn from(key: &String) -> Self {
        ImageKey::Store(key.clone())
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKey::Store(key) => f.write_str(key),
            ImageKey::LocalPath(path) => write!(f, "{}", path.display()),
        }
    }
}

// =============================================================================
// TransformIdentity
// =============================================================================

/// Name of one rendition of an original.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TransformIdentity {
    /// The original, re-encoded as-is.
    #[default]
    Default,

    /// A caller-named transform.
    Named(String),
}

impl TransformIdentity {
    /// An empty name collapses to [`TransformIdentity::Default`].
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            TransformIdentity::Default
        } else {
            TransformIdentity::Named(name)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransformIdentity::Default => DEFAULT_IDENTITY,
            TransformIdentity::Named(name) => name,
        }
    }
}

impl fmt::Display for TransformIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CacheKey
// =============================================================================

/// Key of a rendition in the cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for `identity` applied to `source`.
///
/// Pure and deterministic: equal inputs always yield the same key.
pub fn derive_cache_key(source: &ImageKey, identity: &TransformIdentity) -> CacheKey {
    let source = source.source_id();
    let identity = identity.as_str();

    let mut hasher = Sha256::new();
    hasher.update(CACHE_KEY_DOMAIN);
    hasher.update((source.len() as u64).to_be_bytes());
    hasher.update(&source);
    hasher.update((identity.len() as u64).to_be_bytes());
    hasher.update(identity.as_bytes());
    let digest = hex::encode(hasher.finalize());

    CacheKey(format!("{}/{}", &digest[..2], digest))
}
