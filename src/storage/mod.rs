//! Chunked recording ingestion and finalization engine.
//!
//! A recording client uploads a live audio stream as small container
//! fragments, one call per chunk. Chunks land in per-session temporary
//! storage, durably written and verified before acknowledgment. When the
//! stream ends, finalization orders the chunks by sequence index, merges
//! them losslessly into a single playable file, and reclaims the temporary
//! storage. The catalog resolves a meeting id to its final artifact for
//! download and delete flows.
//!
//! The recordings root is process-wide shared filesystem state: created at
//! startup, mutated here, never torn down.

pub mod catalog;
pub mod chunk_writer;
pub mod concat;
pub mod error;
pub mod finalizer;
pub mod session;

pub use catalog::{ArtifactInfo, RecordingCatalog};
pub use chunk_writer::{ChunkAck, ChunkWriter};
pub use concat::{ContainerConcatenator, FfmpegConcatenator};
pub use error::StorageError;
pub use finalizer::{FinalArtifact, Finalizer};
pub use session::SessionDirs;

/// Container extension for chunks and final artifacts alike; the uploads
/// are fragmented WebM produced by MediaRecorder-style capture.
pub const CONTAINER_EXT: &str = "webm";

/// Width of the zero-padded sequence index in chunk filenames. Padding keeps
/// lexicographic and numeric ordering identical.
pub const CHUNK_PAD_WIDTH: usize = 5;

/// Highest accepted sequence index. One past this the padded names stop
/// sorting correctly, so the writer rejects the chunk instead.
pub const MAX_CHUNK_INDEX: u32 = 99_999;

pub(crate) const TEMP_DIR: &str = "temp";
pub(crate) const CHUNK_PREFIX: &str = "chunk_";

/// `chunk_00042.webm` for index 42.
pub(crate) fn chunk_file_name(index: u32) -> String {
    format!(
        "{}{:0width$}.{}",
        CHUNK_PREFIX,
        index,
        CONTAINER_EXT,
        width = CHUNK_PAD_WIDTH
    )
}
