//! Decides which cataloged files still need uploading.

use bucket_sync_models::FileEntry;

use crate::remote::RemoteIndex;

/// Files to upload, in catalog order, plus how many were already present.
#[derive(Debug, Default)]
pub struct Plan {
    /// Entries whose key is missing from the bucket.
    pub work: Vec<FileEntry>,
    /// Entries whose key already exists.
    pub already_synced: u64,
}

/// Keeps every entry whose remote key is absent from `remote`.
///
/// Keys were joined from the remote prefix and local path at catalog time
/// (see [`bucket_sync_models::join_remote_key`]); no other filtering happens
/// here.
#[must_use]
pub fn plan(entries: &[FileEntry], remote: &RemoteIndex) -> Plan {
    let mut plan = Plan::default();
    for entry in entries {
        if remote.contains(&entry.remote_key) {
            log::trace!("{} already in bucket", entry.remote_key);
            plan.already_synced += 1;
        } else {
            plan.work.push(entry.clone());
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucket_sync_models::join_remote_key;

    fn entry(path: &str, prefix: &str) -> FileEntry {
        FileEntry {
            local_path: path.to_string(),
            file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            remote_key: join_remote_key(prefix, path),
            content_hash: crate::catalog::path_hash(path),
            size_bytes: 1,
            fs_path: std::path::PathBuf::from(path),
        }
    }

    #[test]
    fn keeps_missing_keys_in_catalog_order() {
        let entries = vec![
            entry("/data/c.png", ""),
            entry("/data/a.png", ""),
            entry("/data/b.png", ""),
        ];
        let remote: RemoteIndex = ["data/a.png".to_string()].into_iter().collect();

        let plan = plan(&entries, &remote);

        let paths: Vec<&str> = plan.work.iter().map(|e| e.local_path.as_str()).collect();
        assert_eq!(paths, vec!["/data/c.png", "/data/b.png"]);
        assert_eq!(plan.already_synced, 1);
    }

    #[test]
    fn prefixed_keys_match_normalized_remote_keys() {
        let entries = vec![entry("/2024/img.png", "/backup/")];
        let remote: RemoteIndex = ["backup/2024/img.png".to_string()].into_iter().collect();

        let plan = plan(&entries, &remote);

        assert!(plan.work.is_empty());
        assert_eq!(plan.already_synced, 1);
    }

    #[test]
    fn empty_remote_plans_everything() {
        let entries = vec![entry("/data/a.png", ""), entry("/data/b.png", "")];
        let plan = plan(&entries, &RemoteIndex::default());

        assert_eq!(plan.work.len(), 2);
        assert_eq!(plan.already_synced, 0);
    }
}
