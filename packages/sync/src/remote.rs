//! Snapshot of what already exists in the bucket.
//!
//! The key set is fetched once per run and never refreshed, so objects
//! written by someone else mid-run go unnoticed.

use std::collections::{BTreeSet, HashSet};

use crate::store::{ObjectStore, StoreError};

/// Errors fetching bucket or object listings. Both abort the run.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The bucket listing failed or was malformed.
    #[error("Unable to retrieve buckets: {0}")]
    BucketList(#[source] StoreError),

    /// The object listing for the target bucket failed.
    #[error("Unable to list objects in bucket {bucket}: {source}")]
    ObjectList {
        /// Bucket being listed.
        bucket: String,
        /// Underlying store error.
        source: StoreError,
    },
}

/// Point-in-time set of object keys in one bucket.
#[derive(Debug, Default, Clone)]
pub struct RemoteIndex {
    keys: HashSet<String>,
}

impl RemoteIndex {
    /// Whether `key` was present when the snapshot was taken.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<String> for RemoteIndex {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Fetches every key currently in `bucket`.
///
/// # Errors
///
/// Returns [`RemoteError::ObjectList`] if the listing fails. The run cannot
/// tell what needs uploading without it.
pub async fn load_existing_keys(
    store: &dyn ObjectStore,
    bucket: &str,
) -> Result<RemoteIndex, RemoteError> {
    log::info!("Listing objects in bucket {bucket}...");

    let keys = store
        .list_object_keys(bucket)
        .await
        .map_err(|source| RemoteError::ObjectList {
            bucket: bucket.to_string(),
            source,
        })?;

    let index: RemoteIndex = keys.into_iter().collect();
    log::info!("  found {} objects", index.len());
    Ok(index)
}

/// Names of the buckets visible to the current credentials.
///
/// # Errors
///
/// Returns [`RemoteError::BucketList`] if the listing fails or is malformed.
pub async fn list_available_buckets(
    store: &dyn ObjectStore,
) -> Result<BTreeSet<String>, RemoteError> {
    let names = store
        .list_buckets()
        .await
        .map_err(RemoteError::BucketList)?;
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn snapshot_contains_listed_keys() {
        let store = MemoryStore::new(&["backups"], &["a/b.png", "c.png"]);
        let index = load_existing_keys(&store, "backups").await.unwrap();

        assert_eq!(index.len(), 2);
        assert!(index.contains("a/b.png"));
        assert!(!index.contains("/a/b.png"));
    }

    #[tokio::test]
    async fn object_listing_failure_is_reported_with_bucket() {
        let store = MemoryStore::new(&["backups"], &[]).failing_object_listing();
        let err = load_existing_keys(&store, "backups").await.unwrap_err();

        assert!(matches!(err, RemoteError::ObjectList { ref bucket, .. } if bucket == "backups"));
    }

    #[tokio::test]
    async fn bucket_names_are_deduplicated_and_sorted() {
        let store = MemoryStore::new(&["zeta", "alpha", "zeta"], &[]);
        let buckets = list_available_buckets(&store).await.unwrap();

        assert_eq!(buckets.into_iter().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn malformed_bucket_listing_is_fatal() {
        let store = MemoryStore::new(&["backups"], &[]).failing_bucket_listing();
        let err = list_available_buckets(&store).await.unwrap_err();

        assert!(matches!(
            err,
            RemoteError::BucketList(StoreError::MalformedResponse { .. })
        ));
    }
}
