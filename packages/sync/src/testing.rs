//! In-memory collaborators for unit tests.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::notify::{Notifier, NotifyError};
use crate::store::{ObjectStore, StoreError};

/// An [`ObjectStore`] backed by a key set. Successful uploads add their key,
/// so a second run against the same store sees them.
pub struct MemoryStore {
    buckets: Vec<String>,
    keys: Mutex<BTreeSet<String>>,
    failing_keys: BTreeSet<String>,
    fail_bucket_listing: bool,
    fail_object_listing: bool,
    calls: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new(buckets: &[&str], keys: &[&str]) -> Self {
        Self {
            buckets: buckets.iter().map(|b| (*b).to_string()).collect(),
            keys: Mutex::new(keys.iter().map(|k| (*k).to_string()).collect()),
            failing_keys: BTreeSet::new(),
            fail_bucket_listing: false,
            fail_object_listing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_bucket_listing(mut self) -> Self {
        self.fail_bucket_listing = true;
        self
    }

    pub fn failing_object_listing(mut self) -> Self {
        self.fail_object_listing = true;
        self
    }

    /// Uploads of `key` fail.
    pub fn failing_upload(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    /// Every call made so far, as `operation` or `operation:argument`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn put_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("put_object:"))
            .count()
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.keys.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        self.record("list_buckets".to_string());
        if self.fail_bucket_listing {
            return Err(StoreError::MalformedResponse {
                operation: "ListBuckets",
                detail: "bucket without a name".to_string(),
            });
        }
        Ok(self.buckets.clone())
    }

    async fn list_object_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        self.record(format!("list_object_keys:{bucket}"));
        if self.fail_object_listing {
            return Err(StoreError::ListObjects {
                bucket: bucket.to_string(),
                source: "simulated listing failure".into(),
            });
        }
        Ok(self.keys().into_iter().collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StoreError> {
        self.record(format!("put_object:{key}"));
        if self.failing_keys.contains(key) {
            return Err(StoreError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: "simulated upload failure".into(),
            });
        }
        tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: Box::new(e),
            })?;
        self.keys.lock().unwrap().insert(key.to_string());
        Ok(())
    }
}

/// A [`Notifier`] that keeps every message it is given.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}
