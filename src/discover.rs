use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ingest::{
    matching_files, GPS_PATTERN, NEXFI_PATTERN, UDP_RECEIVER_PATTERN, UDP_SENDER_PATTERN,
};
use crate::models::Role;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub path: PathBuf,
    pub has_udp: bool,
    pub has_nexfi: bool,
    pub has_gps: bool,
    pub modified: Option<DateTime<Utc>>,
}

impl DatasetInfo {
    /// The UDP pair is the minimum needed for an analysis run.
    pub fn usable(&self) -> bool {
        self.has_udp
    }
}

fn any_match(dataset: &Path, role: Role, pattern: &str) -> anyhow::Result<bool> {
    let files = matching_files(&dataset.join(role.as_str()), pattern)?;
    Ok(!files.is_empty())
}

/// Lists subdirectories of `root` that contain both `sender/` and `receiver/`,
/// newest first. A missing root has no datasets.
pub fn scan_datasets(root: &Path) -> anyhow::Result<Vec<DatasetInfo>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut datasets = Vec::new();
    let entries =
        std::fs::read_dir(root).with_context(|| format!("failed to list {}", root.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !Role::ALL.iter().all(|role| path.join(role.as_str()).is_dir()) {
            continue;
        }

        let has_udp = any_match(&path, Role::Sender, UDP_SENDER_PATTERN)?
            && any_match(&path, Role::Receiver, UDP_RECEIVER_PATTERN)?;
        let has_nexfi = any_match(&path, Role::Sender, NEXFI_PATTERN)?
            || any_match(&path, Role::Receiver, NEXFI_PATTERN)?;
        let has_gps = any_match(&path, Role::Sender, GPS_PATTERN)?
            || any_match(&path, Role::Receiver, GPS_PATTERN)?;
        let modified = std::fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        datasets.push(DatasetInfo {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path,
            has_udp,
            has_nexfi,
            has_gps,
            modified,
        });
    }

    datasets.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(datasets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_sender_receiver_folders() {
        let root = tempfile::tempdir().unwrap();
        let full = root.path().join("20250612190350");
        fs::create_dir_all(full.join("sender")).unwrap();
        fs::create_dir_all(full.join("receiver")).unwrap();
        fs::write(full.join("sender/udp_sender_1.csv"), "").unwrap();
        fs::write(full.join("receiver/udp_receiver_1.csv"), "").unwrap();
        fs::write(full.join("receiver/gps_logger_drone2_1.csv"), "").unwrap();

        let partial = root.path().join("sender_only");
        fs::create_dir_all(partial.join("sender")).unwrap();

        let half = root.path().join("no_udp");
        fs::create_dir_all(half.join("sender")).unwrap();
        fs::create_dir_all(half.join("receiver")).unwrap();
        fs::write(half.join("sender/nexfi_status_1.csv"), "").unwrap();

        let datasets = scan_datasets(root.path()).unwrap();
        assert_eq!(datasets.len(), 2);

        let full_info = datasets.iter().find(|d| d.name == "20250612190350").unwrap();
        assert!(full_info.usable());
        assert!(full_info.has_gps);
        assert!(!full_info.has_nexfi);

        let half_info = datasets.iter().find(|d| d.name == "no_udp").unwrap();
        assert!(!half_info.usable());
        assert!(half_info.has_nexfi);
    }

    #[test]
    fn missing_root_has_no_datasets() {
        let root = tempfile::tempdir().unwrap();
        assert!(scan_datasets(&root.path().join("data")).unwrap().is_empty());
    }
}
