//! End-of-run summary.

use std::fmt;
use std::time::Duration;

use bucket_sync_models::SyncCounters;

/// Subject line used when the summary is sent as a notification.
pub const SUBJECT: &str = "Bucket Sync Results";

const HEADER: &str = "************************* RESULTS ***********************";
const FOOTER: &str = "***********************************************************";

/// Final tallies of a run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Counters as they stood when the run ended.
    pub counters: SyncCounters,
    /// Wall-clock time since the session started.
    pub elapsed: Duration,
    /// Whether uploads were simulated.
    pub dry_run: bool,
}

impl SyncReport {
    /// Renders the summary text. See [`summarize`].
    #[must_use]
    pub fn summary(&self) -> String {
        summarize(&self.counters, self.elapsed.as_secs_f64(), self.dry_run)
    }

    /// Whether any upload failed.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.counters.upload_errors > 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Renders the run summary.
///
/// "Examined" is cataloged plus extension-ignored files; size-ignored files
/// have their own line and their warnings, but are not part of that total.
/// Accumulated warnings and errors follow the footer verbatim.
#[must_use]
pub fn summarize(counters: &SyncCounters, elapsed_seconds: f64, dry_run: bool) -> String {
    let mut lines = vec![HEADER.to_string()];
    if dry_run {
        lines.push("This is a dry run!!, no files uploaded".to_string());
    }
    lines.push(format!("Total time: {elapsed_seconds:.3} (s)"));
    lines.push(format!("Total files examined: {}", counters.examined()));
    lines.push(format!("Total files uploaded: {}", counters.files_uploaded));
    lines.push(format!(
        "Total files ignored (already in bucket): {}",
        counters.files_already_synced
    ));
    lines.push(format!(
        "Total files ignored (file extension blacklist): {}",
        counters.files_ignored_by_extension
    ));
    lines.push(format!(
        "Total files ignored (exceeds max file size): {}",
        counters.files_ignored_by_size
    ));
    lines.push(format!("Total upload errors: {}", counters.upload_errors));
    lines.push(FOOTER.to_string());
    lines.extend(counters.messages.iter().cloned());

    lines.join("\n")
}
