//! End-to-end ingestion flow: chunk a known byte stream, upload out of
//! order, finalize, and check the assembled artifact plus cleanup behavior.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunkvault::storage::{
    ChunkWriter, ContainerConcatenator, Finalizer, RecordingCatalog, SessionDirs, StorageError,
};

/// Test concatenator that appends the inputs byte-for-byte, so the merged
/// artifact can be compared directly against the original stream.
struct ByteAppendConcatenator;

#[async_trait]
impl ContainerConcatenator for ByteAppendConcatenator {
    async fn concat(
        &self,
        _session_id: &str,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<(), StorageError> {
        let mut merged = Vec::new();
        for input in inputs {
            merged.extend(tokio::fs::read(input).await?);
        }
        tokio::fs::write(output, merged).await?;
        Ok(())
    }
}

struct Harness {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    writer: ChunkWriter,
    finalizer: Finalizer,
    catalog: RecordingCatalog,
}

fn harness() -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    let dirs = Arc::new(SessionDirs::new(&root));
    Harness {
        writer: ChunkWriter::new(dirs.clone()),
        finalizer: Finalizer::new(dirs, Arc::new(ByteAppendConcatenator)),
        catalog: RecordingCatalog::new(&root),
        _tmp: tmp,
        root,
    }
}

#[tokio::test]
async fn split_ingest_finalize_round_trips_the_stream() {
    let h = harness();

    // A known "stream", split into uneven chunks like a timesliced recorder
    // would produce: 100 + 250 + 50 bytes.
    let stream: Vec<u8> = (0u32..400).map(|i| (i % 251) as u8).collect();
    let parts = [&stream[..100], &stream[100..350], &stream[350..]];

    // Upload out of arrival order; each ack reports the logical size.
    for index in [1usize, 2, 0] {
        let ack = h
            .writer
            .write_chunk("meet123", index as u32, parts[index])
            .await
            .unwrap();
        assert_eq!(ack.bytes_written, parts[index].len() as u64);
    }

    let artifact = h.finalizer.finalize("meet123").await.unwrap();
    assert_eq!(artifact.chunks_merged, 3);
    assert_eq!(artifact.file_size, 400);

    let merged = tokio::fs::read(&artifact.path).await.unwrap();
    assert_eq!(merged, stream);

    // Temp storage reclaimed, exactly one artifact under the root.
    assert!(!h.root.join("temp").join("meet123").exists());
    let files: Vec<String> = std::fs::read_dir(&h.root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("meet123_"));
    assert!(files[0].ends_with(".webm"));
}

#[tokio::test]
async fn retried_chunk_upload_is_idempotent() {
    let h = harness();

    h.writer.write_chunk("s1", 0, b"garbled....").await.unwrap();
    h.writer.write_chunk("s1", 0, b"clean").await.unwrap();
    h.writer.write_chunk("s1", 1, b"!").await.unwrap();

    let artifact = h.finalizer.finalize("s1").await.unwrap();
    let merged = tokio::fs::read(&artifact.path).await.unwrap();
    assert_eq!(merged, b"clean!");
}

#[tokio::test]
async fn finalized_artifact_is_discoverable_and_deletable() {
    let h = harness();

    h.writer.write_chunk("meet456", 0, b"audio").await.unwrap();
    let artifact = h.finalizer.finalize("meet456").await.unwrap();

    let info = h.catalog.find_latest("meet456").await.unwrap().unwrap();
    assert_eq!(info.filename, artifact.filename);
    assert_eq!(info.file_size, 5);

    h.catalog.delete("meet456").await.unwrap();
    assert!(h.catalog.find_latest("meet456").await.unwrap().is_none());

    let err = h.catalog.delete("meet456").await.unwrap_err();
    assert!(matches!(err, StorageError::ArtifactNotFound(_)));
}

#[tokio::test]
async fn finalize_errors_keep_sessions_independent() {
    let h = harness();

    h.writer.write_chunk("a", 0, b"aa").await.unwrap();
    h.writer.write_chunk("b", 0, b"bb").await.unwrap();

    h.finalizer.finalize("a").await.unwrap();

    // Session "a" is gone; "b" is untouched and still finalizable.
    assert!(matches!(
        h.finalizer.finalize("a").await.unwrap_err(),
        StorageError::SessionNotFound(_)
    ));
    let artifact = h.finalizer.finalize("b").await.unwrap();
    assert_eq!(artifact.chunks_merged, 1);
}
