//! Run settings that do not come from positional arguments.
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! environment variables.
//!
//! ```toml
//! remote_prefix = "backup/"
//! max_file_size_bytes = 4294967296
//! extension_blacklist = ["xml", "txt", "edi"]
//! mail_to = "ops@example.com"
//! concurrency = 4
//! ```
//!
//! | Variable | Overrides |
//! |---|---|
//! | `BUCKET_SYNC_REMOTE_PREFIX` | `remote_prefix` |
//! | `BUCKET_SYNC_MAX_FILE_SIZE` | `max_file_size_bytes` |
//! | `BUCKET_SYNC_BLACKLIST` | `extension_blacklist` (comma-separated) |
//! | `BUCKET_SYNC_MAIL_TO` | `mail_to` |
//! | `BUCKET_SYNC_CONCURRENCY` | `concurrency` |

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bucket_sync_models::{
    DEFAULT_EXTENSION_BLACKLIST, DEFAULT_MAX_FILE_SIZE_BYTES, SyncOptions,
};
use serde::Deserialize;

/// Errors loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file {}: {source}", path.display())]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`].
    #[error("Failed to parse settings file {}: {source}", path.display())]
    Parse {
        /// Settings file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// An environment variable held an unusable value.
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Settings shared by every run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Prefix joined in front of each local path to form the bucket key.
    pub remote_prefix: String,
    /// Files strictly larger than this are skipped.
    pub max_file_size_bytes: u64,
    /// Extensions never uploaded (without the dot, case-sensitive).
    pub extension_blacklist: BTreeSet<String>,
    /// Where to mail the summary. No mail is sent when unset.
    pub mail_to: Option<String>,
    /// `sendmail`-compatible program used for `mail_to`.
    pub sendmail_program: Option<PathBuf>,
    /// Uploads in flight at once.
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_prefix: String::new(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            extension_blacklist: DEFAULT_EXTENSION_BLACKLIST
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            mail_to: None,
            sendmail_program: None,
            concurrency: 1,
        }
    }
}

impl Settings {
    /// Loads defaults, then `path` (if any), then the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file cannot be read or parsed, or an
    /// environment variable holds an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Reads settings from a TOML file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Read`] or [`SettingsError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Overrides fields from variables returned by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidEnv`] for non-numeric sizes or
    /// concurrency values.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(prefix) = lookup("BUCKET_SYNC_REMOTE_PREFIX") {
            self.remote_prefix = prefix;
        }
        if let Some(value) = lookup("BUCKET_SYNC_MAX_FILE_SIZE") {
            self.max_file_size_bytes = parse_number("BUCKET_SYNC_MAX_FILE_SIZE", &value)?;
        }
        if let Some(value) = lookup("BUCKET_SYNC_BLACKLIST") {
            self.extension_blacklist = value
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.'))
                .filter(|ext| !ext.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(mail_to) = lookup("BUCKET_SYNC_MAIL_TO") {
            self.mail_to = Some(mail_to).filter(|m| !m.trim().is_empty());
        }
        if let Some(value) = lookup("BUCKET_SYNC_CONCURRENCY") {
            self.concurrency = parse_number("BUCKET_SYNC_CONCURRENCY", &value)?;
        }
        Ok(())
    }

    /// Combines these settings with the positional arguments.
    #[must_use]
    pub fn to_options(&self, bucket: String, root_dir: String, dry_run: bool) -> SyncOptions {
        SyncOptions {
            bucket,
            root_dir,
            remote_prefix: self.remote_prefix.clone(),
            dry_run,
            extension_blacklist: self.extension_blacklist.clone(),
            max_file_size_bytes: self.max_file_size_bytes,
            concurrency: self.concurrency,
        }
    }
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| SettingsError::InvalidEnv {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.remote_prefix, "");
        assert_eq!(settings.max_file_size_bytes, 4_294_967_296);
        assert_eq!(
            settings.extension_blacklist.iter().collect::<Vec<_>>(),
            vec!["edi", "txt", "xml"]
        );
        assert_eq!(settings.mail_to, None);
        assert_eq!(settings.concurrency, 1);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            remote_prefix = "/backup/"
            mail_to = "ops@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(settings.remote_prefix, "/backup/");
        assert_eq!(settings.mail_to.as_deref(), Some("ops@example.com"));
        assert_eq!(settings.max_file_size_bytes, DEFAULT_MAX_FILE_SIZE_BYTES);
        assert!(settings.extension_blacklist.contains("xml"));
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let result: Result<Settings, _> = toml::from_str("bucket = \"nope\"");
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut settings = Settings {
            remote_prefix: "from-file/".to_string(),
            ..Settings::default()
        };
        settings
            .apply_env(env(&[
                ("BUCKET_SYNC_REMOTE_PREFIX", "from-env/"),
                ("BUCKET_SYNC_MAX_FILE_SIZE", "1024"),
                ("BUCKET_SYNC_BLACKLIST", "log, .tmp,,bak"),
                ("BUCKET_SYNC_CONCURRENCY", "4"),
            ]))
            .unwrap();

        assert_eq!(settings.remote_prefix, "from-env/");
        assert_eq!(settings.max_file_size_bytes, 1024);
        assert_eq!(
            settings.extension_blacklist.iter().collect::<Vec<_>>(),
            vec!["bak", "log", "tmp"]
        );
        assert_eq!(settings.concurrency, 4);
    }

    #[test]
    fn blank_mail_to_disables_mail() {
        let mut settings = Settings {
            mail_to: Some("ops@example.com".to_string()),
            ..Settings::default()
        };
        settings
            .apply_env(env(&[("BUCKET_SYNC_MAIL_TO", " ")]))
            .unwrap();
        assert_eq!(settings.mail_to, None);
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(env(&[("BUCKET_SYNC_MAX_FILE_SIZE", "4GB")]))
            .unwrap_err();

        assert!(matches!(
            err,
            SettingsError::InvalidEnv { name: "BUCKET_SYNC_MAX_FILE_SIZE", .. }
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join("bucket_sync_settings_missing.toml");
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            Settings::from_file(&path),
            Err(SettingsError::Read { .. })
        ));
    }

    #[test]
    fn file_round_trip_into_options() {
        let path = std::env::temp_dir().join("bucket_sync_settings_file.toml");
        std::fs::write(
            &path,
            "remote_prefix = \"archive/\"\nextension_blacklist = [\"iso\"]\nconcurrency = 2\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        let options = settings.to_options("backups".to_string(), "/data".to_string(), true);

        assert_eq!(options.bucket, "backups");
        assert_eq!(options.root_dir, "/data");
        assert_eq!(options.remote_prefix, "archive/");
        assert!(options.dry_run);
        assert_eq!(
            options.extension_blacklist.iter().collect::<Vec<_>>(),
            vec!["iso"]
        );
        assert_eq!(options.concurrency, 2);

        let _ = std::fs::remove_file(&path);
    }
}
