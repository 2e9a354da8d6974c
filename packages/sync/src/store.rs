//! Object-storage collaborator used by the sync engine.
//!
//! The engine only needs three calls: list buckets, list the keys of one
//! bucket, and upload a local file under a key. Backends implement
//! [`ObjectStore`]; `bucket_sync_s3` provides the AWS SDK one.

use std::path::Path;

use async_trait::async_trait;

/// Errors reported by an [`ObjectStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// `ListBuckets` failed.
    #[error("Failed to list buckets: {source}")]
    ListBuckets {
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `ListObjects` failed.
    #[error("Failed to list s3://{bucket}: {source}")]
    ListObjects {
        /// Bucket name.
        bucket: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A listing response was missing data the engine relies on.
    #[error("Malformed {operation} response: {detail}")]
    MalformedResponse {
        /// Operation that produced the response.
        operation: &'static str,
        /// What was missing.
        detail: String,
    },
}

/// Narrow object-storage interface consumed by the sync engine.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of every bucket visible to the current credentials.
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;

    /// Every object key in `bucket`, across all result pages.
    async fn list_object_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError>;

    /// Uploads the file at `path` as `bucket/key`.
    ///
    /// The file is opened for the duration of this call only.
    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StoreError>;
}
