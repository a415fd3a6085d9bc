//! Error taxonomy for the recording storage engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by chunk ingestion, finalization, and catalog lookup.
///
/// Chunk-level errors never abort a session: each chunk write is independent
/// and retryable. Finalize-level errors leave the session's temporary state
/// on disk so the call can be retried or the chunks inspected.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid session id {0:?}")]
    InvalidSessionId(String),

    #[error("chunk index {index} exceeds the maximum of {max} for session {session_id}")]
    ChunkIndexOutOfRange {
        session_id: String,
        index: u32,
        max: u32,
    },

    #[error(
        "chunk {index} for session {session_id} failed verification: \
         persisted {persisted} bytes, expected {expected}"
    )]
    ChunkVerificationFailed {
        session_id: String,
        index: u32,
        persisted: u64,
        expected: u64,
    },

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("no chunks received for session {0}")]
    NoChunksReceived(String),

    #[error("concatenation failed for session {session_id}: {detail}")]
    ConcatenationFailed { session_id: String, detail: String },

    #[error("final artifact already exists at {0:?}")]
    ArtifactNameCollision(PathBuf),

    #[error("no recording found for meeting {0}")]
    ArtifactNotFound(String),

    #[error("finalization already in progress for session {0}")]
    FinalizeInProgress(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
