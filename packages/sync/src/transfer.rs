//! Uploads the planned work list.
//!
//! A failed upload is counted and recorded, never fatal: the remaining
//! files are still attempted. Up to [`SyncConfiguration::concurrency`]
//! uploads run at once; their outcomes are folded into a fresh
//! [`SyncCounters`] by a single consumer.

use std::sync::Arc;

use bucket_sync_models::{FileEntry, SyncConfiguration, SyncCounters};

use crate::progress::ProgressCallback;
use crate::store::ObjectStore;

/// Log a progress line after every this many successful uploads.
const PROGRESS_LOG_INTERVAL: u64 = 100;

/// Uploads (or, in dry-run mode, counts) every entry in `work` and returns
/// the transfer-stage counters.
pub async fn run(
    work: Vec<FileEntry>,
    config: &SyncConfiguration,
    store: &dyn ObjectStore,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> SyncCounters {
    use futures::stream::{self, StreamExt as _};

    let mut counters = SyncCounters::default();
    let total = work.len() as u64;
    if let Some(p) = progress {
        p.set_total(total);
    }

    if config.dry_run() {
        for entry in &work {
            log::debug!("dry run: would upload {} -> {}", entry.local_path, entry.remote_key);
            record_success(&mut counters, total);
            advance(progress, entry);
        }
        finish(progress, &counters);
        return counters;
    }

    let bucket = config.bucket();
    let mut outcomes = stream::iter(work.into_iter().map(move |entry| async move {
        let result = store
            .put_object(bucket, &entry.remote_key, &entry.fs_path)
            .await;
        (entry, result)
    }))
    .buffer_unordered(config.concurrency());

    while let Some((entry, result)) = outcomes.next().await {
        match result {
            Ok(()) => {
                log::debug!("uploaded {} -> {}", entry.local_path, entry.remote_key);
                record_success(&mut counters, total);
            }
            Err(e) => {
                log::warn!("Upload failed for {}: {e}", entry.local_path);
                counters.upload_errors += 1;
                counters.messages.push(format!(
                    "Failed to upload {} -> {}: {e}",
                    entry.local_path, entry.remote_key
                ));
            }
        }
        advance(progress, &entry);
    }

    finish(progress, &counters);
    counters
}

/// Counts one success. Returns the running total when it lands on a
/// progress log line.
fn record_success(counters: &mut SyncCounters, total: u64) -> Option<u64> {
    counters.files_uploaded += 1;
    if counters.files_uploaded % PROGRESS_LOG_INTERVAL == 0 {
        log::info!("({} / {total})", counters.files_uploaded);
        Some(counters.files_uploaded)
    } else {
        None
    }
}

fn advance(progress: Option<&Arc<dyn ProgressCallback>>, entry: &FileEntry) {
    if let Some(p) = progress {
        p.set_message(entry.remote_key.clone());
        p.inc(1);
    }
}

fn finish(progress: Option<&Arc<dyn ProgressCallback>>, counters: &SyncCounters) {
    if let Some(p) = progress {
        p.finish(format!(
            "{} uploaded, {} failed",
            counters.files_uploaded, counters.upload_errors
        ));
    }
}
