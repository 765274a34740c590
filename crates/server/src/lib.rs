pub mod batch;
pub mod db;
pub mod ingest;
pub mod routes;

#[cfg(test)]
pub(crate) mod testutil;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use lectern_common::config::ServerAppConfig;
use lectern_extract::ocr::OcrEngine;
use lectern_store::ContentStore;

pub struct AppState {
    pub config: ServerAppConfig,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub store: ContentStore,
    pub ocr: Arc<dyn OcrEngine>,
}

impl AppState {
    /// Create the data directory, the content store and the document
    /// database, and wire in the OCR engine.
    pub fn init(config: ServerAppConfig, ocr: Arc<dyn OcrEngine>) -> Result<Self> {
        let data_dir = PathBuf::from(&config.server.data_dir);
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data dir {}", data_dir.display()))?;

        let store = ContentStore::new(data_dir.join("content"))?;

        let db_path = data_dir.join("documents.db");
        db::open(&db_path).context("opening document database")?;

        Ok(Self {
            config,
            data_dir,
            db_path,
            store,
            ocr,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // Body must fit a whole bulk upload; per-file sizes are validated again
    // at intake.
    let body_limit = state.config.ingest.max_file_bytes() as usize
        * state.config.ingest.max_batch_files.max(1)
        + 1024 * 1024;

    Router::new()
        .route("/api/v1/documents", post(routes::upload_single))
        .route("/api/v1/documents/bulk", post(routes::upload_bulk))
        .route("/api/v1/documents/{id}", get(routes::get_document))
        .route("/api/v1/documents/{id}/content", get(routes::serve_content))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
