#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Amazon S3 backend for bucket sync.
//!
//! Implements [`ObjectStore`] on top of `aws-sdk-s3`. Works against AWS and
//! any S3-compatible service (R2, `MinIO`, ...) when an endpoint override is
//! supplied.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `AWS_ACCESS_KEY_ID` | Yes | Access key |
//! | `AWS_SECRET_ACCESS_KEY` | Yes | Secret key |
//! | `AWS_SESSION_TOKEN` | No | Session token for temporary credentials |
//! | `AWS_REGION` | No | Region, defaults to `us-east-1` |
//! | `BUCKET_SYNC_ENDPOINT_URL` | No | Endpoint for S3-compatible services (enables path-style addressing) |

use std::path::Path;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bucket_sync::store::{ObjectStore, StoreError};

/// Region used when `AWS_REGION` is unset.
const DEFAULT_REGION: &str = "us-east-1";

/// Object store backed by an `aws-sdk-s3` client.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Creates a store from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingEnv`] if the access key or secret key is
    /// unset.
    pub fn from_env() -> Result<Self, StoreError> {
        let access_key = require_env("AWS_ACCESS_KEY_ID")?;
        let secret_key = require_env("AWS_SECRET_ACCESS_KEY")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let endpoint = std::env::var("BUCKET_SYNC_ENDPOINT_URL").ok();

        let creds = Credentials::new(
            &access_key,
            &secret_key,
            session_token,
            None,
            "bucket-sync-env",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(region))
            .credentials_provider(creds);

        if let Some(endpoint) = &endpoint {
            log::debug!("Using S3 endpoint override {endpoint}");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::from_client(aws_sdk_s3::Client::from_conf(builder.build())))
    }

    /// Wraps an already-configured client.
    #[must_use]
    pub const fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        log::debug!("Listing buckets");

        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_buckets();
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| StoreError::ListBuckets {
                source: Box::new(e),
            })?;

            for bucket in output.buckets() {
                let name = bucket.name().ok_or_else(|| StoreError::MalformedResponse {
                    operation: "ListBuckets",
                    detail: "bucket entry without a name".to_string(),
                })?;
                names.push(name.to_string());
            }

            match output.continuation_token() {
                Some(token) if !token.is_empty() => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        log::debug!("  found {} buckets", names.len());
        Ok(names)
    }

    async fn list_object_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| StoreError::ListObjects {
                bucket: bucket.to_string(),
                source: Box::new(e),
            })?;

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    keys.push(key.to_string());
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
                if continuation_token.is_none() {
                    return Err(StoreError::MalformedResponse {
                        operation: "ListObjectsV2",
                        detail: "truncated page without a continuation token".to_string(),
                    });
                }
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StoreError> {
        let upload_error = |source: Box<dyn std::error::Error + Send + Sync>| StoreError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        };

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| upload_error(Box::new(e)))?;

        log::debug!("Pushing {} -> s3://{bucket}/{key}", path.display());

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type("application/octet-stream")
            .send()
            .await
            .map_err(|e| upload_error(Box::new(e)))?;

        Ok(())
    }
}

/// Reads a required environment variable.
fn require_env(name: &str) -> Result<String, StoreError> {
    std::env::var(name).map_err(|_| StoreError::MissingEnv {
        name: name.to_string(),
    })
}
