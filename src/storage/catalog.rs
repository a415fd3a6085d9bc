//! Final-artifact lookup over the recordings root.
//!
//! There is no index: a lookup is a scan of the artifact directory for
//! filenames prefixed with the meeting id, picking the most recently
//! modified match. That is O(n) in the total artifact count per lookup,
//! which is fine at the expected volume. The same scan backs the metadata,
//! download, and delete flows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::storage::error::StorageError;
use crate::storage::CONTAINER_EXT;

/// Metadata for one final artifact on disk.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub filename: String,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub path: PathBuf,
}

pub struct RecordingCatalog {
    root: PathBuf,
}

impl RecordingCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Finds the final artifact for a meeting.
    ///
    /// Artifacts are named `{nativeMeetingId}_{timestamp}.webm`; when more
    /// than one matches (a meeting recorded more than once), the most
    /// recently modified file is authoritative.
    pub async fn find_latest(
        &self,
        native_meeting_id: &str,
    ) -> Result<Option<ArtifactInfo>, StorageError> {
        let prefix = format!("{}_", native_meeting_id);

        let mut newest: Option<(std::time::SystemTime, ArtifactInfo)> = None;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let is_artifact = name.starts_with(&prefix)
                && Path::new(name)
                    .extension()
                    .is_some_and(|ext| ext == CONTAINER_EXT);
            if !is_artifact {
                continue;
            }

            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified()?;

            let replace = match &newest {
                Some((best, _)) => modified > *best,
                None => true,
            };
            if replace {
                newest = Some((
                    modified,
                    ArtifactInfo {
                        filename: name.to_string(),
                        file_size: meta.len(),
                        created_at: modified.into(),
                        path: entry.path(),
                    },
                ));
            }
        }

        debug!(
            "Catalog lookup for meeting {}: {}",
            native_meeting_id,
            match &newest {
                Some((_, info)) => info.filename.as_str(),
                None => "no match",
            }
        );
        Ok(newest.map(|(_, info)| info))
    }

    /// Deletes the meeting's current artifact (the most recent match).
    pub async fn delete(&self, native_meeting_id: &str) -> Result<ArtifactInfo, StorageError> {
        let info = self
            .find_latest(native_meeting_id)
            .await?
            .ok_or_else(|| StorageError::ArtifactNotFound(native_meeting_id.to_string()))?;

        tokio::fs::remove_file(&info.path).await?;
        info!("Deleted recording {:?}", info.path);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, RecordingCatalog) {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = RecordingCatalog::new(tmp.path());
        (tmp, catalog)
    }

    #[tokio::test]
    async fn test_lookup_misses_return_none() {
        let (_tmp, catalog) = setup();
        assert!(catalog.find_latest("meet123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_matches_prefix_and_extension_only() {
        let (tmp, catalog) = setup();
        std::fs::write(tmp.path().join("meet123_2026-01-01.webm"), b"yes").unwrap();
        std::fs::write(tmp.path().join("meet123_notes.txt"), b"no").unwrap();
        std::fs::write(tmp.path().join("other_2026-01-01.webm"), b"no").unwrap();

        let info = catalog.find_latest("meet123").await.unwrap().unwrap();
        assert_eq!(info.filename, "meet123_2026-01-01.webm");
        assert_eq!(info.file_size, 3);
    }

    #[tokio::test]
    async fn test_most_recent_artifact_wins() {
        let (tmp, catalog) = setup();
        std::fs::write(tmp.path().join("meet123_old.webm"), b"old").unwrap();
        // Coarse-mtime filesystems need a beat between the writes
        std::thread::sleep(std::time::Duration::from_millis(30));
        std::fs::write(tmp.path().join("meet123_new.webm"), b"new").unwrap();

        let info = catalog.find_latest("meet123").await.unwrap().unwrap();
        assert_eq!(info.filename, "meet123_new.webm");
    }

    #[tokio::test]
    async fn test_delete_removes_only_the_selected_artifact() {
        let (tmp, catalog) = setup();
        std::fs::write(tmp.path().join("meet123_a.webm"), b"a").unwrap();
        std::fs::write(tmp.path().join("keepme_b.webm"), b"b").unwrap();

        catalog.delete("meet123").await.unwrap();
        assert!(!tmp.path().join("meet123_a.webm").exists());
        assert!(tmp.path().join("keepme_b.webm").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_artifact_is_not_found() {
        let (_tmp, catalog) = setup();
        let err = catalog.delete("ghost").await.unwrap_err();
        assert!(matches!(err, StorageError::ArtifactNotFound(_)));
    }
}
