//! Local directory walk and eligibility filtering.
//!
//! [`catalog`] visits every entry under the root, drops hidden entries,
//! blacklisted extensions and oversized files, and records the survivors as
//! [`FileEntry`] values keyed by the MD5 of their path string.
//!
//! Only an unreadable root is fatal. Anything below the root that cannot be
//! read is skipped and tallied in [`Catalog::unreadable`].

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use bucket_sync_models::{FileEntry, SyncCounters, join_remote_key};
use walkdir::{DirEntry, WalkDir};

/// Errors that stop the catalog from being built.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The root directory itself could not be opened.
    #[error("Unable to read directory {}: {source}", path.display())]
    DirectoryUnreadable {
        /// Root that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Eligible local files plus the tallies collected while walking.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<FileEntry>,
    by_hash: HashMap<String, usize>,
    /// Files skipped because their extension is blacklisted.
    pub ignored_by_extension: u64,
    /// Files skipped because they exceed the size limit.
    pub ignored_by_size: u64,
    /// Subdirectories and files that could not be read.
    pub unreadable: u64,
    /// Size-limit and hash-collision warnings, in walk order.
    pub warnings: Vec<String>,
}

impl Catalog {
    /// Entries in walk order. A colliding hash keeps the first entry's
    /// position but holds the last entry's data.
    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Number of distinct hashes cataloged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk tallies and warnings, ready to merge into the run's counters.
    #[must_use]
    pub fn counters(&self) -> SyncCounters {
        SyncCounters {
            files_cataloged: self.entries.len() as u64,
            files_ignored_by_extension: self.ignored_by_extension,
            files_ignored_by_size: self.ignored_by_size,
            messages: self.warnings.clone(),
            ..SyncCounters::default()
        }
    }

    /// Inserts `entry`, replacing any entry with the same hash.
    ///
    /// Returns `true` when an existing entry was replaced.
    fn insert(&mut self, entry: FileEntry) -> bool {
        if let Some(&idx) = self.by_hash.get(&entry.content_hash) {
            self.entries[idx] = entry;
            true
        } else {
            self.by_hash
                .insert(entry.content_hash.clone(), self.entries.len());
            self.entries.push(entry);
            false
        }
    }
}

/// What a single walked entry turned into.
#[derive(Debug)]
enum WalkStep {
    /// A file eligible for upload.
    Accepted(FileEntry),
    /// A directory; its children are visited by the walker.
    Directory,
    /// Extension is blacklisted.
    Blacklisted,
    /// Larger than the size limit.
    Oversized { local_path: String },
    /// Could not be read. Skipped without a warning.
    Unreadable {
        path: Option<PathBuf>,
        reason: String,
    },
    /// Neither a file nor a directory (socket, fifo, device).
    Other,
}

/// Walks `root_dir` and builds the catalog of files eligible for upload.
///
/// Each file's remote key is `join_remote_key(remote_prefix, local_path)`
/// where `local_path` is `root_dir` (with a trailing `/` added if missing)
/// followed by the file's root-relative path.
///
/// # Errors
///
/// Returns [`CatalogError::DirectoryUnreadable`] if `root_dir` cannot be
/// opened.
pub fn catalog(
    root_dir: &str,
    blacklist: &BTreeSet<String>,
    max_size_bytes: u64,
    remote_prefix: &str,
) -> Result<Catalog, CatalogError> {
    let root = Path::new(root_dir);
    std::fs::read_dir(root).map_err(|source| CatalogError::DirectoryUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let base = if root_dir.ends_with('/') {
        root_dir.to_string()
    } else {
        format!("{root_dir}/")
    };

    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    let mut catalog = Catalog::default();

    for item in walker {
        let step = match item {
            Ok(entry) => classify(&entry, root, &base, blacklist, max_size_bytes, remote_prefix),
            Err(e) => WalkStep::Unreadable {
                path: e.path().map(Path::to_path_buf),
                reason: e.to_string(),
            },
        };

        match step {
            WalkStep::Accepted(entry) => {
                let local_path = entry.local_path.clone();
                if catalog.insert(entry) {
                    log::warn!("Hash collision for {local_path}, keeping the later entry");
                    catalog
                        .warnings
                        .push(format!("WARNING: FOUND A HASH COLLISION, DUPLICATE FILE: {local_path}"));
                }
            }
            WalkStep::Blacklisted => catalog.ignored_by_extension += 1,
            WalkStep::Oversized { local_path } => {
                log::warn!("Skipping {local_path}: exceeds max file size of {max_size_bytes} bytes");
                catalog.ignored_by_size += 1;
                catalog.warnings.push(format!(
                    "The following file will not be processed as it exceeds the max file size: {local_path}"
                ));
            }
            WalkStep::Unreadable { path, reason } => {
                log::debug!(
                    "Skipping unreadable entry {}: {reason}",
                    path.as_deref().map_or_else(|| "?".into(), Path::to_string_lossy)
                );
                catalog.unreadable += 1;
            }
            WalkStep::Directory | WalkStep::Other => {}
        }
    }

    log::debug!(
        "Cataloged {} file(s) under {root_dir} ({} blacklisted, {} oversized, {} unreadable)",
        catalog.len(),
        catalog.ignored_by_extension,
        catalog.ignored_by_size,
        catalog.unreadable,
    );

    Ok(catalog)
}

/// Names starting with `.` are skipped along with everything below them.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn classify(
    entry: &DirEntry,
    root: &Path,
    base: &str,
    blacklist: &BTreeSet<String>,
    max_size_bytes: u64,
    remote_prefix: &str,
) -> WalkStep {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return WalkStep::Directory;
    }
    if !file_type.is_file() {
        return WalkStep::Other;
    }

    if let Err(e) = File::open(entry.path()) {
        return WalkStep::Unreadable {
            path: Some(entry.path().to_path_buf()),
            reason: e.to_string(),
        };
    }

    let path = entry.path();
    let blacklisted = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| blacklist.contains(ext));
    if blacklisted {
        return WalkStep::Blacklisted;
    }

    let local_path = local_path_string(base, root, path);

    let size_bytes = match entry.metadata() {
        Ok(meta) => meta.len(),
        Err(e) => {
            return WalkStep::Unreadable {
                path: Some(path.to_path_buf()),
                reason: e.to_string(),
            };
        }
    };
    if size_bytes > max_size_bytes {
        return WalkStep::Oversized { local_path };
    }

    WalkStep::Accepted(FileEntry {
        remote_key: join_remote_key(remote_prefix, &local_path),
        content_hash: path_hash(&local_path),
        file_name: entry.file_name().to_string_lossy().into_owned(),
        size_bytes,
        local_path,
        fs_path: path.to_path_buf(),
    })
}

/// `base` followed by `path`'s components below `root`, `/`-separated.
fn local_path_string(base: &str, root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut out = base.to_string();
    let mut first = true;
    for component in relative.components() {
        if !first {
            out.push('/');
        }
        out.push_str(&component.as_os_str().to_string_lossy());
        first = false;
    }
    out
}

/// Hex MD5 of the path string. Identifies the path, not the file contents.
#[must_use]
pub fn path_hash(local_path: &str) -> String {
    format!("{:x}", md5::compute(local_path.as_bytes()))
}
