#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! One-way sync of a local directory tree into an object-storage bucket.
//!
//! A run walks the local tree ([`catalog`]), snapshots the bucket's keys
//! ([`remote`]), keeps only the files whose key is missing remotely
//! ([`planner`]), uploads them ([`transfer`]), and finally renders a
//! summary ([`report`]). [`session::SyncSession`] drives the stages in that
//! order and owns the run's [`SyncCounters`].
//!
//! Storage and notification delivery are reached through the
//! [`store::ObjectStore`] and [`notify::Notifier`] traits so the engine can
//! run against S3, an S3-compatible service, or an in-memory fake.

pub mod catalog;
pub mod notify;
pub mod planner;
pub mod progress;
pub mod remote;
pub mod report;
pub mod session;
pub mod store;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use bucket_sync_models::{
    ConfigError, FileEntry, SyncConfiguration, SyncCounters, SyncOptions,
};

/// Errors that abort a sync run before any upload starts.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Run parameters failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The local directory could not be cataloged.
    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),

    /// The bucket or object listing could not be fetched.
    #[error(transparent)]
    Remote(#[from] remote::RemoteError),

    /// The configured bucket is not visible to the current credentials.
    #[error("Unable to find bucket '{bucket}' in your bucket list")]
    BucketNotFound {
        /// Bucket that was requested.
        bucket: String,
        /// Buckets that are available, sorted by name.
        available: Vec<String>,
    },

    /// The background directory walk panicked or was cancelled.
    #[error("Directory walk task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
