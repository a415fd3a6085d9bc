//! Per-session temporary chunk storage.
//!
//! Each in-progress recording session owns a directory under
//! `<recordings root>/temp/{session_id}/` holding its chunk files. The
//! directory is created lazily on the first chunk, enumerated at finalize
//! time, and removed only after a verified-successful finalization.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::storage::error::StorageError;
use crate::storage::{chunk_file_name, CHUNK_PREFIX, CONTAINER_EXT, TEMP_DIR};

/// Manages the temporary-storage namespace for recording sessions.
pub struct SessionDirs {
    root: PathBuf,
}

impl SessionDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The recordings root, where final artifacts land.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn temp_root(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    /// Path of the session's temp directory. Does not touch the filesystem.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf, StorageError> {
        validate_session_id(session_id)?;
        Ok(self.temp_root().join(session_id))
    }

    /// Creates the session's temp directory if it does not exist yet.
    ///
    /// `create_dir_all` is idempotent, so concurrent first-chunk arrivals
    /// for the same session cannot race each other into an error.
    pub async fn ensure_session_dir(&self, session_id: &str) -> Result<PathBuf, StorageError> {
        let dir = self.session_dir(session_id)?;
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Path a chunk with the given sequence index is stored at.
    pub fn chunk_path(&self, session_id: &str, index: u32) -> Result<PathBuf, StorageError> {
        Ok(self.session_dir(session_id)?.join(chunk_file_name(index)))
    }

    /// All persisted chunks for the session, sorted ascending by sequence
    /// index. Zero-padded names make the lexicographic filename sort equal
    /// to the numeric sort; the writer enforces the padding-width bound.
    pub async fn list_chunks_ordered(
        &self,
        session_id: &str,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let dir = self.session_dir(session_id)?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::SessionNotFound(session_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut chunks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let is_chunk = name.starts_with(CHUNK_PREFIX)
                && Path::new(name)
                    .extension()
                    .is_some_and(|ext| ext == CONTAINER_EXT);
            if is_chunk {
                chunks.push(entry.path());
            }
        }

        if chunks.is_empty() {
            return Err(StorageError::NoChunksReceived(session_id.to_string()));
        }

        chunks.sort();
        debug!("Session {} has {} chunk(s) on disk", session_id, chunks.len());
        Ok(chunks)
    }

    /// Recursively removes the session's temp directory and everything in it.
    ///
    /// Only the finalizer calls this, after the final artifact has been
    /// verified. Not safe while chunks are still being written.
    pub async fn delete_session_dir(&self, session_id: &str) -> Result<(), StorageError> {
        let dir = self.session_dir(session_id)?;
        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }
}

/// Session ids arrive as caller-supplied path segments, so anything that
/// could escape the temp namespace is rejected outright.
fn validate_session_id(session_id: &str) -> Result<(), StorageError> {
    let ok = !session_id.is_empty()
        && session_id != "."
        && session_id != ".."
        && !session_id.contains(['/', '\\', '\0']);
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidSessionId(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, SessionDirs) {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = SessionDirs::new(tmp.path());
        (tmp, dirs)
    }

    #[tokio::test]
    async fn test_list_missing_session_is_not_found() {
        let (_tmp, dirs) = setup();
        let err = dirs.list_chunks_ordered("nope").await.unwrap_err();
        assert!(matches!(err, StorageError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_empty_session_is_no_chunks() {
        let (_tmp, dirs) = setup();
        dirs.ensure_session_dir("empty").await.unwrap();
        let err = dirs.list_chunks_ordered("empty").await.unwrap_err();
        assert!(matches!(err, StorageError::NoChunksReceived(_)));
    }

    #[tokio::test]
    async fn test_chunks_listed_in_index_order() {
        let (_tmp, dirs) = setup();
        let dir = dirs.ensure_session_dir("meet123").await.unwrap();

        // Write chunk files out of arrival order
        for index in [7u32, 0, 12, 3] {
            tokio::fs::write(dir.join(chunk_file_name(index)), b"x")
                .await
                .unwrap();
        }

        let chunks = dirs.list_chunks_ordered("meet123").await.unwrap();
        let names: Vec<_> = chunks
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "chunk_00000.webm",
                "chunk_00003.webm",
                "chunk_00007.webm",
                "chunk_00012.webm"
            ]
        );
    }

    #[tokio::test]
    async fn test_non_chunk_files_ignored() {
        let (_tmp, dirs) = setup();
        let dir = dirs.ensure_session_dir("s1").await.unwrap();
        tokio::fs::write(dir.join(chunk_file_name(0)), b"x")
            .await
            .unwrap();
        tokio::fs::write(dir.join("list.txt"), b"bookkeeping")
            .await
            .unwrap();

        let chunks = dirs.list_chunks_ordered("s1").await.unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_session_dir_removes_everything() {
        let (_tmp, dirs) = setup();
        let dir = dirs.ensure_session_dir("gone").await.unwrap();
        tokio::fs::write(dir.join(chunk_file_name(0)), b"x")
            .await
            .unwrap();

        dirs.delete_session_dir("gone").await.unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_hostile_session_ids_rejected() {
        for id in ["", ".", "..", "a/b", "a\\b", "../../etc"] {
            assert!(validate_session_id(id).is_err(), "accepted {:?}", id);
        }
        assert!(validate_session_id("meet123-abc_DEF").is_ok());
    }
}
