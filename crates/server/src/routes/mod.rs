mod serve;
mod upload;

pub use serve::{get_document, serve_content};
pub use upload::{upload_bulk, upload_single};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use lectern_common::error::IngestError;

// ── Shared helpers ────────────────────────────────────────────────────────────

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map a per-file ingest error to the status the single-upload endpoint
/// surfaces directly. Bulk uploads never use this — their per-file errors
/// stay in the response body.
pub(crate) fn ingest_error_response(e: &IngestError) -> Response {
    let status = match e {
        IngestError::Validation(_) => StatusCode::BAD_REQUEST,
        IngestError::StorageWrite(_)
        | IngestError::Extraction(_)
        | IngestError::Ocr(_)
        | IngestError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, e.to_string())
}
