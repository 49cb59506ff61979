//! Binary object storage abstraction and public file URLs.
//!
//! Objects live in a single bucket under slash-separated paths. A stored object is handed
//! to clients as a [`FileUrl`]: a download URL embedding the bucket, the percent-encoded
//! object path and a download token. Deleting a file means parsing that URL back into
//! the object path.

use std::{fmt::Debug, fmt};

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a blob storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    /// No object exists at the path.
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    /// The object path is not acceptable to the storage.
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    /// The storage could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Any other storage-side failure.
    #[error("storage error: {0}")]
    Internal(String),
}

impl BlobStoreError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BlobStoreError::ObjectNotFound(_) => "storage/object-not-found",
            BlobStoreError::InvalidPath(_) => "storage/invalid-argument",
            BlobStoreError::Unavailable(_) => "storage/retry-limit-exceeded",
            BlobStoreError::Internal(_) => "storage/unknown",
        }
    }
}

/// A specialized `Result` type for blob storage operations.
pub type BlobResult<T> = Result<T, BlobStoreError>;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Path of the object inside the bucket.
    pub path: String,
    /// MIME type recorded at upload.
    pub content_type: Option<String>,
    /// Token that authorizes public downloads.
    pub download_token: String,
    /// Size in bytes.
    pub size: usize,
}

/// Abstract interface for binary object storage.
#[async_trait]
pub trait BlobStorage: Send + Sync + Debug {
    /// Name of the bucket objects are stored in.
    fn bucket(&self) -> &str;

    /// Stores `bytes` at `path`, replacing any existing object.
    async fn put_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        download_token: &str,
    ) -> BlobResult<StoredObject>;

    /// Returns the bytes and metadata stored at `path`, or `None`.
    async fn get_object(&self, path: &str) -> BlobResult<Option<(StoredObject, Vec<u8>)>>;

    /// Deletes the object at `path`.
    ///
    /// # Errors
    ///
    /// Fails with [`BlobStoreError::ObjectNotFound`] when nothing is stored there.
    async fn delete_object(&self, path: &str) -> BlobResult<()>;
}

/// Error returned when a string is not a file URL produced by [`FileUrl`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a file URL: {0}")]
pub struct FileUrlError(pub String);

/// A public download URL of a stored object.
///
/// Format: `<base>/v0/b/<bucket>/o/<percent-encoded path>?alt=media&token=<token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUrl {
    /// URL prefix, without trailing slash.
    pub base: String,
    /// Bucket name.
    pub bucket: String,
    /// Object path, decoded.
    pub path: String,
    /// Download token, if the URL carried one.
    pub token: Option<String>,
}

impl FileUrl {
    /// Builds the download URL of `object` stored in `bucket`.
    pub fn new(base: &str, bucket: &str, object: &StoredObject) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            path: object.path.clone(),
            token: Some(object.download_token.clone()),
        }
    }

    /// Parses a download URL back into its parts.
    ///
    /// The bucket is the segment between `/v0/b/` and the next `/o/`; the object path is
    /// what follows up to the query string, percent-decoded.
    pub fn parse(url: &str) -> Result<Self, FileUrlError> {
        let invalid = || FileUrlError(url.to_string());

        let (base, rest) = url.split_once("/v0/b/").ok_or_else(invalid)?;
        let (bucket, tail) = rest.split_once("/o/").ok_or_else(invalid)?;
        let (encoded_path, query) = match tail.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (tail, None),
        };

        if bucket.is_empty() || bucket.contains('/') || encoded_path.is_empty() {
            return Err(invalid());
        }

        let path = urlencoding::decode(encoded_path)
            .map_err(|_| invalid())?
            .into_owned();
        let token = query.and_then(|query| {
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("token="))
                .map(str::to_string)
        });

        Ok(Self {
            base: base.to_string(),
            bucket: bucket.to_string(),
            path,
            token,
        })
    }
}

impl fmt::Display for FileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/v0/b/{}/o/{}?alt=media",
            self.base,
            self.bucket,
            urlencoding::encode(&self.path)
        )?;

        if let Some(token) = &self.token {
            write!(f, "&token={token}")?;
        }

        Ok(())
    }
}
