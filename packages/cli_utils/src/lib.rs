#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the bucket sync CLI.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so `log` output is suspended while the upload bar
//! redraws. [`IndicatifProgress`] shows per-file upload progress for one
//! bucket.

use std::sync::Arc;
use std::time::Duration;

use bucket_sync::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Upload bar for one sync run, rendered through [`ProgressCallback`].
///
/// Spins while the bucket is checked and the directory walked. Once the work
/// list size is known it becomes a bar prefixed with the bucket, and the
/// message column shows the key of the file that finished last.
pub struct IndicatifProgress {
    bar: ProgressBar,
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates the bar for uploads into `bucket` and adds it to `multi`.
    #[must_use]
    pub fn upload_bar(multi: &MultiProgress, bucket: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::build(multi, bucket))
    }

    fn build(multi: &MultiProgress, bucket: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(format!("s3://{bucket}"));
        bar.set_message(format!("Comparing local files with s3://{bucket}"));

        let bar_style = ProgressStyle::with_template(
            "  {prefix:.bold} {bar:30.cyan/dim} {pos}/{len} files [{eta}] {wide_msg:.dim}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, bar_style }
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
        self.bar.set_message(String::new());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, key: String) {
        self.bar.set_message(key);
    }

    fn finish(&self, summary: String) {
        self.bar.finish_with_message(summary);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Defaults to `info` when `RUST_LOG` is unset. Returns the
/// [`MultiProgress`] that progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Info);
        }
    }
    let logger = builder.build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already set (tests)

    log::set_max_level(level);

    multi
}
