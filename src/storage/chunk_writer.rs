//! Durable, verified chunk writes.
//!
//! Each call persists one chunk of an in-progress recording. The write is
//! flushed and fsynced before it is acknowledged, then the persisted size is
//! read back and compared against the payload length. A mismatch is reported
//! as `ChunkVerificationFailed` and the caller is expected to retry the
//! chunk; rewriting the same index simply overwrites, so retries are safe.

use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::storage::error::StorageError;
use crate::storage::session::SessionDirs;
use crate::storage::MAX_CHUNK_INDEX;

/// Acknowledgment returned for a verified chunk write.
#[derive(Debug, Clone)]
pub struct ChunkAck {
    pub session_id: String,
    pub sequence_index: u32,
    pub bytes_written: u64,
}

pub struct ChunkWriter {
    dirs: Arc<SessionDirs>,
}

impl ChunkWriter {
    pub fn new(dirs: Arc<SessionDirs>) -> Self {
        Self { dirs }
    }

    /// Writes one chunk for a session and verifies it landed on disk.
    ///
    /// The session's temp directory is created on first use. Zero-length
    /// payloads are valid chunks. Writes to distinct sequence indices target
    /// distinct files and may run fully in parallel.
    pub async fn write_chunk(
        &self,
        session_id: &str,
        sequence_index: u32,
        payload: &[u8],
    ) -> Result<ChunkAck, StorageError> {
        if sequence_index > MAX_CHUNK_INDEX {
            // Past the zero-padding width the filename sort order breaks,
            // so refuse loudly instead of misordering at finalize time.
            return Err(StorageError::ChunkIndexOutOfRange {
                session_id: session_id.to_string(),
                index: sequence_index,
                max: MAX_CHUNK_INDEX,
            });
        }

        self.dirs.ensure_session_dir(session_id).await?;
        let path = self.dirs.chunk_path(session_id, sequence_index)?;

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(payload).await?;
        file.flush().await?;
        // Durable before acknowledged, not merely in the page cache.
        file.sync_all().await?;
        drop(file);

        verify_persisted(&path, session_id, sequence_index, payload.len() as u64).await?;

        info!(
            "Saved chunk {} for session {} ({} bytes)",
            sequence_index,
            session_id,
            payload.len()
        );

        Ok(ChunkAck {
            session_id: session_id.to_string(),
            sequence_index,
            bytes_written: payload.len() as u64,
        })
    }
}

/// Reads back the persisted size and compares it to the declared length.
async fn verify_persisted(
    path: &Path,
    session_id: &str,
    index: u32,
    expected: u64,
) -> Result<(), StorageError> {
    let persisted = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };

    if persisted != expected {
        error!(
            "Chunk {} verification failed for session {}: {} bytes on disk, expected {}",
            index, session_id, persisted, expected
        );
        return Err(StorageError::ChunkVerificationFailed {
            session_id: session_id.to_string(),
            index,
            persisted,
            expected,
        });
    }

    Ok(())
}
