use crate::api::{ApiServer, RecordingsState};
use crate::config::Config;
use crate::storage::{
    ChunkWriter, ContainerConcatenator, FfmpegConcatenator, Finalizer, RecordingCatalog,
    SessionDirs,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub async fn run_service() -> Result<()> {
    info!("Starting Chunkvault service");

    let config = Config::load()?;

    let root = config.storage.recordings_dir()?;
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create recordings directory {:?}", root))?;
    info!("Recordings directory: {:?}", root);

    let concatenator: Arc<dyn ContainerConcatenator> = match &config.storage.ffmpeg_path {
        Some(path) => Arc::new(FfmpegConcatenator::with_binary(path)),
        None => Arc::new(FfmpegConcatenator::discover()?),
    };

    let dirs = Arc::new(SessionDirs::new(root.clone()));
    let state = RecordingsState {
        writer: Arc::new(ChunkWriter::new(dirs.clone())),
        finalizer: Arc::new(Finalizer::new(dirs, concatenator)),
        catalog: Arc::new(RecordingCatalog::new(root)),
    };

    let api_server = ApiServer::new(&config, state);
    api_server.start().await
}
