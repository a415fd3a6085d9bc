//! Recording finalization: ordered assembly of a session's chunks into a
//! single final artifact, followed by temp-storage cleanup.
//!
//! The no-data-loss policy: temporary chunks are deleted only after the
//! output artifact has been verified on disk. Any failure before that point
//! leaves the session directory untouched for diagnosis or retry.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

use crate::storage::concat::ContainerConcatenator;
use crate::storage::error::StorageError;
use crate::storage::session::SessionDirs;
use crate::storage::CONTAINER_EXT;

/// The single assembled media file produced by a successful finalization.
#[derive(Debug, Clone)]
pub struct FinalArtifact {
    pub filename: String,
    pub path: PathBuf,
    pub chunks_merged: usize,
    pub file_size: u64,
}

pub struct Finalizer {
    dirs: Arc<SessionDirs>,
    concatenator: Arc<dyn ContainerConcatenator>,
    in_flight: Mutex<HashSet<String>>,
}

impl Finalizer {
    pub fn new(dirs: Arc<SessionDirs>, concatenator: Arc<dyn ContainerConcatenator>) -> Self {
        Self {
            dirs,
            concatenator,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Assembles all chunks of a session into one final artifact.
    ///
    /// Callers must ensure all chunks are durably written before invoking
    /// this; there is no "wait for more chunks" semantic. A session that was
    /// already finalized (and cleaned up) reports `SessionNotFound`, and a
    /// concurrent second call for the same session reports
    /// `FinalizeInProgress` rather than racing the cleanup.
    pub async fn finalize(&self, session_id: &str) -> Result<FinalArtifact, StorageError> {
        let _guard = self.claim(session_id)?;

        let chunks = self.dirs.list_chunks_ordered(session_id).await?;
        info!(
            "Finalizing session {} with {} chunk(s)",
            session_id,
            chunks.len()
        );

        let mut input_bytes: u64 = 0;
        for chunk in &chunks {
            input_bytes += tokio::fs::metadata(chunk).await?.len();
        }

        let filename = artifact_file_name(session_id, Utc::now());
        let output = self.dirs.root().join(&filename);
        if tokio::fs::try_exists(&output).await? {
            // Session id plus millisecond timestamp should never collide;
            // if it does, refuse to overwrite an existing recording.
            error!(
                "Artifact name collision for session {}: {:?}",
                session_id, output
            );
            return Err(StorageError::ArtifactNameCollision(output));
        }

        if let Err(e) = self.concatenator.concat(session_id, &chunks, &output).await {
            error!(
                "Concatenation failed for session {}, temp chunks preserved: {}",
                session_id, e
            );
            return Err(e);
        }

        let file_size = self.verify_output(session_id, &output, input_bytes).await?;

        // The artifact is safe; losing the cleanup is an inconvenience, not
        // a failure of the finalization.
        if let Err(e) = self.dirs.delete_session_dir(session_id).await {
            warn!(
                "Failed to clean up temp directory for session {}: {}",
                session_id, e
            );
        }

        info!(
            "Finalized session {}: {} ({} bytes from {} chunks)",
            session_id,
            filename,
            file_size,
            chunks.len()
        );

        Ok(FinalArtifact {
            filename,
            path: output,
            chunks_merged: chunks.len(),
            file_size,
        })
    }

    /// Output must exist and, unless the inputs totaled zero bytes, must be
    /// non-empty before the temp chunks may be deleted.
    async fn verify_output(
        &self,
        session_id: &str,
        output: &std::path::Path,
        input_bytes: u64,
    ) -> Result<u64, StorageError> {
        let meta = match tokio::fs::metadata(output).await {
            Ok(meta) => meta,
            Err(_) => {
                return Err(StorageError::ConcatenationFailed {
                    session_id: session_id.to_string(),
                    detail: format!("output {:?} missing after concatenation", output),
                });
            }
        };

        if meta.len() == 0 && input_bytes > 0 {
            return Err(StorageError::ConcatenationFailed {
                session_id: session_id.to_string(),
                detail: format!(
                    "output {:?} is empty but inputs totaled {} bytes",
                    output, input_bytes
                ),
            });
        }

        Ok(meta.len())
    }

    fn claim(&self, session_id: &str) -> Result<FlightGuard<'_>, StorageError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(session_id.to_string()) {
            return Err(StorageError::FinalizeInProgress(session_id.to_string()));
        }
        Ok(FlightGuard {
            in_flight: &self.in_flight,
            session_id: session_id.to_string(),
        })
    }
}

/// Releases the per-session finalize claim when the call completes, on
/// success and on every error path alike.
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    session_id: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
    }
}

/// `{sessionId}_{UTC timestamp}.webm`, millisecond precision, with colons
/// avoided so the name is filesystem-safe everywhere.
fn artifact_file_name(session_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        session_id,
        now.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
        CONTAINER_EXT
    )
}
