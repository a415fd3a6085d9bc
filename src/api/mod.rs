//! REST API server for Chunkvault.
//!
//! Provides HTTP endpoints for:
//! - Chunk ingestion during an in-progress recording
//! - Finalization of a session into one playable file
//! - Final-artifact lookup, download, and deletion

pub mod error;
pub mod routes;

use crate::config::Config;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::recordings::RecordingsState;

pub struct ApiServer {
    host: String,
    port: u16,
    max_chunk_bytes: usize,
    state: RecordingsState,
}

impl ApiServer {
    pub fn new(config: &Config, state: RecordingsState) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            max_chunk_bytes: config.server.max_chunk_bytes,
            state,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/health", get(health))
            .merge(routes::recordings::router(self.state, self.max_chunk_bytes))
            .layer(ServiceBuilder::new());

        let listener =
            tokio::net::TcpListener::bind(&format!("{}:{}", self.host, self.port)).await?;

        info!("API server listening on http://{}:{}", self.host, self.port);
        info!("Endpoints:");
        info!("  GET    /                - Service info");
        info!("  GET    /health          - Health check");
        info!("  PUT    /stream/:session/:index - Upload a chunk");
        info!("  POST   /finalize/:session      - Finalize a recording");
        info!("  GET    /recordings/:platform/:id          - Recording metadata");
        info!("  GET    /recordings/:platform/:id/download - Download recording");
        info!("  DELETE /recordings/:platform/:id          - Delete recording");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "chunkvault",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
