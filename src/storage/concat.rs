//! Lossless container-level concatenation.
//!
//! Chunks produced by a MediaRecorder-style capture with a timeslice are
//! independently-initialized fragments of a streaming container, so a naive
//! byte-level append does not yield a playable file. The production
//! implementation shells out to ffmpeg with the concat *protocol*
//! (`-i "concat:a|b|c" -c copy`), which remuxes the fragment headers without
//! re-encoding the audio samples.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::storage::error::StorageError;

/// Capability seam for merging ordered media fragments into one artifact.
///
/// Keeping this behind a trait isolates the one piece of format-specific,
/// non-portable logic from the finalization engine.
#[async_trait]
pub trait ContainerConcatenator: Send + Sync {
    /// Merges `inputs`, in the order given, into a single file at `output`.
    async fn concat(
        &self,
        session_id: &str,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<(), StorageError>;
}

/// ffmpeg-backed concatenator using the concat protocol with stream copy.
pub struct FfmpegConcatenator {
    binary: PathBuf,
}

impl FfmpegConcatenator {
    /// Resolves `ffmpeg` from `PATH`.
    pub fn discover() -> Result<Self> {
        let binary = which::which("ffmpeg")
            .context("ffmpeg not found in PATH (required for finalization)")?;
        Ok(Self { binary })
    }

    /// Uses an explicit ffmpeg binary instead of searching `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ContainerConcatenator for FfmpegConcatenator {
    async fn concat(
        &self,
        session_id: &str,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<(), StorageError> {
        // "concat:chunk_00000.webm|chunk_00001.webm|..."
        let joined = inputs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("|");
        let concat_input = format!("concat:{}", joined);

        debug!(
            "Running ffmpeg concat for session {} ({} inputs) -> {:?}",
            session_id,
            inputs.len(),
            output
        );

        let result = tokio::process::Command::new(&self.binary)
            .arg("-nostdin")
            .arg("-i")
            .arg(&concat_input)
            .arg("-c")
            .arg("copy")
            .arg(output)
            .output()
            .await
            .map_err(|e| StorageError::ConcatenationFailed {
                session_id: session_id.to_string(),
                detail: format!("failed to spawn {:?}: {}", self.binary, e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            error!(
                "ffmpeg concatenation failed for session {} ({}): {}",
                session_id,
                result.status,
                stderr.trim()
            );
            return Err(StorageError::ConcatenationFailed {
                session_id: session_id.to_string(),
                detail: stderr_tail(&stderr),
            });
        }

        debug!("ffmpeg concatenation completed for session {}", session_id);
        Ok(())
    }
}

/// Last portion of ffmpeg's stderr; the banner at the top is noise, the
/// actual failure reason is at the end.
fn stderr_tail(stderr: &str) -> String {
    const TAIL: usize = 800;
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth_back(TAIL) {
        Some((idx, _)) => format!("...{}", &trimmed[idx..]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_short_output_unchanged() {
        assert_eq!(stderr_tail("boom\n"), "boom");
    }

    #[test]
    fn test_stderr_tail_truncates_long_output() {
        let long = "x".repeat(5000);
        let tail = stderr_tail(&long);
        assert!(tail.starts_with("..."));
        assert!(tail.len() < 1000);
    }

    #[tokio::test]
    async fn test_missing_binary_is_concatenation_failed() {
        let concat = FfmpegConcatenator::with_binary("/nonexistent/ffmpeg");
        let err = concat
            .concat(
                "s1",
                &[PathBuf::from("/tmp/a.webm")],
                Path::new("/tmp/out.webm"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ConcatenationFailed { .. }));
    }
}
