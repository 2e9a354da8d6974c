//! Drives one sync run from bucket validation to the final report.
//!
//! Stages run strictly in order: bucket check, directory walk, remote key
//! snapshot, planning, upload. [`SyncSession::finalize`] must be called
//! whether [`SyncSession::sync`] succeeded or not;
//! [`SyncSession::sync_and_finalize`] does both.

use std::sync::Arc;
use std::time::Instant;

use bucket_sync_models::{SyncConfiguration, SyncCounters};

use crate::notify::Notifier;
use crate::progress::ProgressCallback;
use crate::report::{self, SyncReport};
use crate::store::ObjectStore;
use crate::{SyncError, catalog, planner, remote, transfer};

/// State of a single run: configuration, collaborators, and counters.
pub struct SyncSession<'a> {
    config: SyncConfiguration,
    store: &'a dyn ObjectStore,
    started: Instant,
    counters: SyncCounters,
}

impl<'a> SyncSession<'a> {
    /// Starts the run clock. No I/O happens until [`Self::sync`].
    #[must_use]
    pub fn new(config: SyncConfiguration, store: &'a dyn ObjectStore) -> Self {
        log::info!("Initiated sync service with bucket {}", config.bucket());
        Self {
            config,
            store,
            started: Instant::now(),
            counters: SyncCounters::default(),
        }
    }

    /// Runs every stage.
    ///
    /// The bucket is validated before the local directory is touched.
    ///
    /// # Errors
    ///
    /// * [`SyncError::Remote`] if the bucket or object listing fails
    /// * [`SyncError::BucketNotFound`] if the configured bucket is not listed
    /// * [`SyncError::Catalog`] if the root directory cannot be read
    ///
    /// Individual upload failures are not errors; they are counted.
    pub async fn sync(
        &mut self,
        progress: Option<&Arc<dyn ProgressCallback>>,
    ) -> Result<(), SyncError> {
        let bucket = self.config.bucket().to_string();

        let available = remote::list_available_buckets(self.store).await?;
        if !available.contains(&bucket) {
            return Err(SyncError::BucketNotFound {
                bucket,
                available: available.into_iter().collect(),
            });
        }

        if self.config.dry_run() {
            log::warn!("Running in dry-run mode: no files will be uploaded");
        }

        let root = self.config.root_dir().to_string();
        let blacklist = self.config.extension_blacklist().clone();
        let max_size = self.config.max_file_size_bytes();
        let prefix = self.config.remote_prefix().to_string();
        let catalog = tokio::task::spawn_blocking(move || {
            catalog::catalog(&root, &blacklist, max_size, &prefix)
        })
        .await??;

        self.counters.merge(catalog.counters());
        log::info!(
            "Total number of files found to process: {}",
            self.counters.examined()
        );

        let index = remote::load_existing_keys(self.store, &bucket).await?;
        let plan = planner::plan(catalog.entries(), &index);
        self.counters.files_already_synced += plan.already_synced;

        log::info!(
            "Beginning upload of {} file(s) ({} already in bucket)...",
            plan.work.len(),
            plan.already_synced
        );
        let transferred = transfer::run(plan.work, &self.config, self.store, progress).await;
        self.counters.merge(transferred);

        Ok(())
    }

    /// Ends the run: builds the report, logs it, and sends it through
    /// `notifier`. A notification failure is logged and otherwise ignored.
    pub async fn finalize(self, notifier: &dyn Notifier) -> SyncReport {
        let report = SyncReport {
            counters: self.counters,
            elapsed: self.started.elapsed(),
            dry_run: self.config.dry_run(),
        };
        let summary = report.summary();

        log::info!("\n{summary}");
        if let Err(e) = notifier.notify(report::SUBJECT, &summary).await {
            log::warn!("Failed to deliver sync summary: {e}");
        }

        report
    }

    /// Runs [`Self::sync`] and then [`Self::finalize`], returning the report
    /// together with the outcome of the run.
    pub async fn sync_and_finalize(
        mut self,
        progress: Option<&Arc<dyn ProgressCallback>>,
        notifier: &dyn Notifier,
    ) -> (SyncReport, Result<(), SyncError>) {
        let result = self.sync(progress).await;
        if let Err(e) = &result {
            log::error!("Sync aborted: {e}");
        }
        let report = self.finalize(notifier).await;
        (report, result)
    }
}
