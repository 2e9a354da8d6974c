#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration, file entry, and counter types for bucket sync runs.
//!
//! These types are shared by the sync engine (`bucket_sync`), the storage
//! adapters, and the CLI. They carry no I/O of their own.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumString};

/// Largest file (in bytes) considered for upload unless overridden: 4 GiB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 4_294_967_296;

/// File extensions skipped unless overridden.
pub const DEFAULT_EXTENSION_BLACKLIST: &[&str] = &["xml", "txt", "edi"];

/// Errors raised while validating a [`SyncConfiguration`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The bucket name was empty.
    #[error("Missing bucket name")]
    EmptyBucket,

    /// The local directory was empty.
    #[error("Missing directory")]
    EmptyDirectory,

    /// Upload concurrency must be at least one.
    #[error("Upload concurrency must be at least 1")]
    ZeroConcurrency,

    /// The dry-run argument was not one of the accepted tokens.
    #[error(
        "Invalid dry-run value '{value}' (expected one of: true, 1, yes, dry, dryrun, dry-run, false, 0, no)"
    )]
    InvalidDryRun {
        /// The rejected value.
        value: String,
    },
}

/// Accepted spellings of the optional dry-run argument.
///
/// Matching is ASCII case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DryRunToken {
    /// Simulate uploads.
    #[strum(
        serialize = "true",
        serialize = "1",
        serialize = "yes",
        serialize = "dry",
        serialize = "dryrun",
        serialize = "dry-run"
    )]
    Enabled,
    /// Perform real uploads.
    #[strum(serialize = "false", serialize = "0", serialize = "no")]
    Disabled,
}

impl DryRunToken {
    /// Whether this token turns dry-run mode on.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Parses the optional dry-run CLI argument into a flag.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDryRun`] for anything outside the accepted
/// token set.
pub fn parse_dry_run(value: &str) -> Result<bool, ConfigError> {
    DryRunToken::from_str(value.trim())
        .map(DryRunToken::is_enabled)
        .map_err(|_| ConfigError::InvalidDryRun {
            value: value.to_string(),
        })
}

/// Builds the bucket key for a local path.
///
/// Leading `/` characters are stripped from the prefix and the path
/// independently before concatenating, so `/backup/` + `/2024/img.png`
/// becomes `backup/2024/img.png`.
#[must_use]
pub fn join_remote_key(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_start_matches('/');
    let path = path.trim_start_matches('/');

    let mut key = String::with_capacity(prefix.len() + path.len());
    key.push_str(prefix);
    key.push_str(path);
    key
}

/// A local file that passed extension and size filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path as walked: the root as given, `/`-terminated, plus the relative
    /// components. Lossy for names that are not UTF-8; only used for the key,
    /// the hash, and messages.
    pub local_path: String,
    /// The file on disk, exactly as the walker found it. Uploads read this.
    pub fs_path: PathBuf,
    /// Final path component.
    pub file_name: String,
    /// Key this file occupies in the bucket.
    pub remote_key: String,
    /// Hex MD5 of `local_path` (the path string, not the file bytes).
    pub content_hash: String,
    /// File size at catalog time.
    pub size_bytes: u64,
}

/// Caller-supplied run parameters, before validation.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Target bucket.
    pub bucket: String,
    /// Local directory to walk.
    pub root_dir: String,
    /// Prefix joined in front of every local path to form the bucket key.
    pub remote_prefix: String,
    /// Count uploads without performing them.
    pub dry_run: bool,
    /// Extensions (without the dot, case-sensitive) never uploaded.
    pub extension_blacklist: BTreeSet<String>,
    /// Files strictly larger than this are skipped with a warning.
    pub max_file_size_bytes: u64,
    /// Number of uploads allowed in flight at once.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            root_dir: String::new(),
            remote_prefix: String::new(),
            dry_run: false,
            extension_blacklist: DEFAULT_EXTENSION_BLACKLIST
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            concurrency: 1,
        }
    }
}

/// Validated, immutable run parameters.
#[derive(Debug, Clone)]
pub struct SyncConfiguration {
    options: SyncOptions,
}

impl SyncConfiguration {
    /// Validates `options` without touching the filesystem or network.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyBucket`] or [`ConfigError::EmptyDirectory`]
    /// when either name is blank, and [`ConfigError::ZeroConcurrency`] when no
    /// upload workers were requested.
    pub fn new(options: SyncOptions) -> Result<Self, ConfigError> {
        if options.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if options.root_dir.trim().is_empty() {
            return Err(ConfigError::EmptyDirectory);
        }
        if options.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        Ok(Self { options })
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.options.bucket
    }

    #[must_use]
    pub fn root_dir(&self) -> &str {
        &self.options.root_dir
    }

    #[must_use]
    pub fn remote_prefix(&self) -> &str {
        &self.options.remote_prefix
    }

    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    #[must_use]
    pub const fn extension_blacklist(&self) -> &BTreeSet<String> {
        &self.options.extension_blacklist
    }

    #[must_use]
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.options.max_file_size_bytes
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.options.concurrency
    }
}

/// Run-wide tallies, read out once at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncCounters {
    /// Entries that survived catalog filtering.
    pub files_cataloged: u64,
    /// Files uploaded (or that would have been, in a dry run).
    pub files_uploaded: u64,
    /// Files whose key already existed in the bucket.
    pub files_already_synced: u64,
    /// Files skipped by the extension blacklist.
    pub files_ignored_by_extension: u64,
    /// Files skipped for exceeding the size limit.
    pub files_ignored_by_size: u64,
    /// Uploads that failed.
    pub upload_errors: u64,
    /// Warnings and errors, in the order they occurred.
    pub messages: Vec<String>,
}

impl SyncCounters {
    /// Merge another set of counters into this one.
    pub fn merge(&mut self, other: Self) {
        self.files_cataloged += other.files_cataloged;
        self.files_uploaded += other.files_uploaded;
        self.files_already_synced += other.files_already_synced;
        self.files_ignored_by_extension += other.files_ignored_by_extension;
        self.files_ignored_by_size += other.files_ignored_by_size;
        self.upload_errors += other.upload_errors;
        self.messages.extend(other.messages);
    }

    /// Files counted as examined: cataloged plus extension-ignored.
    ///
    /// Size-ignored files are reported through their warnings and their own
    /// counter, not through this total.
    #[must_use]
    pub const fn examined(&self) -> u64 {
        self.files_cataloged + self.files_ignored_by_extension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_strips_leading_slashes_on_both_sides() {
        assert_eq!(
            join_remote_key("/backup/", "/2024/img.png"),
            "backup/2024/img.png"
        );
        assert_eq!(join_remote_key("", "/data/a.png"), "data/a.png");
        assert_eq!(join_remote_key("//x/", "//y"), "x/y");
    }

    #[test]
    fn join_does_not_insert_separator() {
        assert_eq!(join_remote_key("backup", "a.png"), "backupa.png");
    }

    #[test]
    fn dry_run_tokens_are_case_insensitive() {
        for token in ["true", "TRUE", "1", "yes", "Dry", "dryrun", "DRY-RUN"] {
            assert!(parse_dry_run(token).unwrap(), "{token}");
        }
        for token in ["false", "0", "No"] {
            assert!(!parse_dry_run(token).unwrap(), "{token}");
        }
    }

    #[test]
    fn dry_run_rejects_unknown_tokens() {
        assert!(matches!(
            parse_dry_run("maybe"),
            Err(ConfigError::InvalidDryRun { value }) if value == "maybe"
        ));
        assert!(parse_dry_run("").is_err());
    }

    #[test]
    fn configuration_rejects_blank_names() {
        let missing_bucket = SyncOptions {
            root_dir: "/data".to_string(),
            ..SyncOptions::default()
        };
        assert!(matches!(
            SyncConfiguration::new(missing_bucket),
            Err(ConfigError::EmptyBucket)
        ));

        let missing_dir = SyncOptions {
            bucket: "backups".to_string(),
            root_dir: "  ".to_string(),
            ..SyncOptions::default()
        };
        assert!(matches!(
            SyncConfiguration::new(missing_dir),
            Err(ConfigError::EmptyDirectory)
        ));
    }

    #[test]
    fn configuration_rejects_zero_concurrency() {
        let options = SyncOptions {
            bucket: "backups".to_string(),
            root_dir: "/data".to_string(),
            concurrency: 0,
            ..SyncOptions::default()
        };
        assert!(matches!(
            SyncConfiguration::new(options),
            Err(ConfigError::ZeroConcurrency)
        ));
    }

    #[test]
    fn default_options_carry_blacklist_and_size_limit() {
        let options = SyncOptions::default();
        assert!(options.extension_blacklist.contains("xml"));
        assert!(options.extension_blacklist.contains("txt"));
        assert!(options.extension_blacklist.contains("edi"));
        assert_eq!(options.max_file_size_bytes, DEFAULT_MAX_FILE_SIZE_BYTES);
        assert_eq!(options.concurrency, 1);
    }

    #[test]
    fn examined_excludes_size_ignored_files() {
        let counters = SyncCounters {
            files_cataloged: 3,
            files_ignored_by_extension: 2,
            files_ignored_by_size: 5,
            ..SyncCounters::default()
        };
        assert_eq!(counters.examined(), 5);
    }

    #[test]
    fn merge_sums_counts_and_appends_messages() {
        let mut a = SyncCounters {
            files_uploaded: 1,
            messages: vec!["first".to_string()],
            ..SyncCounters::default()
        };
        a.merge(SyncCounters {
            files_uploaded: 2,
            upload_errors: 1,
            messages: vec!["second".to_string()],
            ..SyncCounters::default()
        });
        assert_eq!(a.files_uploaded, 3);
        assert_eq!(a.upload_errors, 1);
        assert_eq!(a.messages, vec!["first", "second"]);
    }
}
