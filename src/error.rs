use thiserror::Error;

/// Errors raised by a blob store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Key cannot be represented by this backend (e.g. path traversal)
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Errors raised while decoding, transforming or encoding an image.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// The bytes are not a supported image
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// The image could not be serialized
    #[error("Failed to encode image: {message}")]
    Encode { message: String },

    /// A caller-supplied transform rejected the image
    #[error("Transform failed: {message}")]
    Transform { message: String },
}

impl CodecError {
    /// Convenience constructor for transform closures.
    pub fn transform(message: impl Into<String>) -> Self {
        CodecError::Transform {
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`Repository`](crate::repository::Repository) operations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// A required construction dependency is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller passed an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key is absent, owned by another prefix, or does not decode as an image
    #[error("Image missing or invalid: {0}")]
    ImageMissingOrInvalid(String),

    /// Underlying store failure, propagated unmodified
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transform or encode failure on a cache miss
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl RepositoryError {
    /// Whether this error means "not a usable image".
    pub fn is_missing_or_invalid(&self) -> bool {
        matches!(self, RepositoryError::ImageMissingOrInvalid(_))
    }
}
