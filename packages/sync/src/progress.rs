//! Progress reporting for the upload phase.
//!
//! The transfer runner reports through [`ProgressCallback`] so the engine
//! never depends on a terminal. The CLI plugs in an `indicatif` bar; passing
//! `None` to the runner disables reporting.

/// Receives upload progress. Shared across upload tasks, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of files scheduled for upload.
    fn set_total(&self, total: u64);

    /// One more file finished (uploaded, simulated, or failed).
    fn inc(&self, delta: u64);

    /// Key of the file that just finished.
    fn set_message(&self, msg: String);

    /// Upload phase is over.
    fn finish(&self, msg: String);
}
