#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point: sync all files in a directory against an S3 bucket.
//!
//! ```text
//! bucket_sync <BUCKET> <DIRECTORY> [DRY_RUN]
//! ```
//!
//! Credentials come from the environment (see `bucket_sync_s3`); the remote
//! prefix, size limit, blacklist, and mail recipient come from
//! [`settings::Settings`].

mod settings;

use std::path::PathBuf;

use bucket_sync::SyncError;
use bucket_sync::notify::{LogNotifier, Notifier, SendmailNotifier};
use bucket_sync::session::SyncSession;
use bucket_sync_cli_utils::IndicatifProgress;
use bucket_sync_models::{SyncConfiguration, parse_dry_run};
use bucket_sync_s3::S3Store;
use clap::Parser;

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "bucket_sync",
    about = "Sync all files in a directory against an S3 bucket"
)]
struct Cli {
    /// Bucket to upload into
    bucket: String,
    /// Local directory to sync
    directory: String,
    /// Count uploads without performing them (true, 1, yes, dry, dryrun,
    /// dry-run; false, 0, no)
    #[arg(value_parser = parse_dry_run)]
    dry_run: Option<bool>,
    /// TOML settings file (falls back to `BUCKET_SYNC_CONFIG`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of uploads in flight (overrides settings)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = bucket_sync_cli_utils::init_logger();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| std::env::var_os("BUCKET_SYNC_CONFIG").map(PathBuf::from));
    let mut settings = Settings::load(config_path.as_deref())?;
    if let Some(concurrency) = cli.concurrency {
        settings.concurrency = concurrency;
    }

    let config = SyncConfiguration::new(settings.to_options(
        cli.bucket,
        cli.directory,
        cli.dry_run.unwrap_or(false),
    ))?;

    let store = S3Store::from_env()?;
    let notifier: Box<dyn Notifier> = match &settings.mail_to {
        Some(recipient) => match &settings.sendmail_program {
            Some(program) => Box::new(SendmailNotifier::with_program(recipient, program)),
            None => Box::new(SendmailNotifier::new(recipient)),
        },
        None => Box::new(LogNotifier),
    };

    let progress = IndicatifProgress::upload_bar(&multi, config.bucket());
    let session = SyncSession::new(config, &store);
    let (report, result) = session
        .sync_and_finalize(Some(&progress), notifier.as_ref())
        .await;

    match result {
        Ok(()) => {
            if report.has_errors() {
                log::warn!(
                    "{} upload(s) failed; re-run to retry them",
                    report.counters.upload_errors
                );
            }
            Ok(())
        }
        Err(SyncError::BucketNotFound { available, .. }) => {
            print!("{}", bucket_suggestions(&available));
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Operator-facing text for an unknown bucket: the buckets that do exist.
fn bucket_suggestions(available: &[String]) -> String {
    use std::fmt::Write as _;

    let mut out = String::from(
        "\nUnable to find the bucket specified in your bucket list.  Did you mean one of the following?\n\n",
    );
    for name in available {
        let _ = writeln!(out, "\t{name}");
    }
    out.push('\n');
    out
}
