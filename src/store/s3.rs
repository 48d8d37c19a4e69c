use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::BlobStore;
use crate::error::StoreError;

/// S3-backed blob store.
///
/// Objects live in a single bucket, optionally under a key prefix, so that a
/// storage tier and a cache tier can share one bucket (`images/originals` and
/// `images/cache`, say). Works with S3-compatible services (MinIO, etc.).
///
/// S3 deletes are idempotent on the wire; `delete` performs a HEAD first so
/// that removing a missing key reports [`StoreError::NotFound`] like every
/// other backend.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    identifier: String,
}

impl S3Store {
    /// Create a store for `bucket`, scoping all keys under `prefix` if given.
    ///
    /// # Arguments
    /// * `client` - AWS S3 client to use for requests
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix, without leading or trailing `/`
    pub fn new(client: Client, bucket: String, prefix: Option<String>) -> Self {
        let prefix = prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        let identifier = match &prefix {
            Some(p) => format!("s3://{}/{}", bucket, p),
            None => format!("s3://{}", bucket),
        };
        Self {
            client,
            bucket,
            prefix,
            identifier,
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the key prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{}/{}", p, key),
            None => key.to_string(),
        }
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.object_key(key))
    }

    async fn head(&self, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                let status = e.raw_response().map(|r| r.status().as_u16());
                if is_not_found || looks_not_found(status, &e.to_string()) {
                    Ok(false)
                } else {
                    Err(StoreError::S3(e.to_string()))
                }
            }
        }
    }
}

/// Detect a 404 from the raw status or the error text, for S3-compatible
/// services that do not map it to a typed variant.
fn looks_not_found(status: Option<u16>, message: &str) -> bool {
    status == Some(404)
        || message.contains("NotFound")
        || message.contains("NoSuchKey")
        || message.contains("404")
}

#[async_trait]
impl BlobStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.head(key).await
    }

    async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| {
                let no_such_key = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                let status = e.raw_response().map(|r| r.status().as_u16());
                if no_such_key || looks_not_found(status, &e.to_string()) {
                    StoreError::NotFound(self.location(key))
                } else {
                    StoreError::S3(e.to_string())
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StoreError::S3(e.to_string()))?;

        debug!(location = %self.location(key), bytes = len, "s3 store write");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if !self.head(key).await? {
            return Err(StoreError::NotFound(self.location(key)));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| StoreError::S3(e.to_string()))?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let list_prefix = self.prefix.as_ref().map(|p| format!("{}/", p));
        let mut continuation_token: Option<String> = None;
        let mut removed = 0usize;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(ref p) = list_prefix {
                request = request.prefix(p);
            }
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let page = request
                .send()
                .await
                .map_err(|e| StoreError::S3(e.to_string()))?;

            for object in page.contents() {
                if let Some(object_key) = object.key() {
                    self.client
                        .delete_object()
                        .bucket(&self.bucket)
                        .key(object_key)
                        .send()
                        .await
                        .map_err(|e| StoreError::S3(e.to_string()))?;
                    removed += 1;
                }
            }

            match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(store = %self.identifier, removed, "s3 store cleared");
        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services usually need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
