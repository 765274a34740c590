use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use lectern_common::api::{AccessTemplate, BulkUploadResponse, UploadResponse};

use crate::batch::{self, BatchContext, BatchFile};
use crate::ingest::{self, IngestJob};
use crate::AppState;

use super::{error_body, ingest_error_response};

// ── POST /api/v1/documents ────────────────────────────────────────────────────

pub async fn upload_single(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut explicit_title = None;
    let mut owner = None;
    let mut course_code = None;
    let mut subject_code = None;
    let mut access = AccessTemplate::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_body(StatusCode::BAD_REQUEST, format!("bad multipart: {e}")),
        };

        match field.name().unwrap_or("") {
            "file" => {
                let name = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((name, bytes.to_vec())),
                    Err(e) => {
                        return error_body(
                            StatusCode::BAD_REQUEST,
                            format!("reading upload: {e}"),
                        )
                    }
                }
            }
            "title" => explicit_title = read_text(field).await,
            "owner" => owner = read_text(field).await,
            "course" => course_code = read_text(field).await,
            "subject" => subject_code = read_text(field).await,
            "access" => {
                if let Some(raw) = read_text(field).await {
                    match serde_json::from_str(&raw) {
                        Ok(parsed) => access = parsed,
                        Err(e) => {
                            return error_body(
                                StatusCode::BAD_REQUEST,
                                format!("bad access template: {e}"),
                            )
                        }
                    }
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let Some((original_name, bytes)) = file else {
        return error_body(StatusCode::BAD_REQUEST, "no file provided");
    };

    let job = IngestJob {
        original_name,
        bytes,
        explicit_title,
        owner,
        course_code,
        subject_code,
        access,
        ocr_page_budget: state.config.ingest.ocr_pages_single,
    };

    match ingest::ingest_file(&state, job).await {
        Ok(outcome) => Json(UploadResponse {
            document: outcome.document,
            processing_info: outcome.info,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "single upload failed");
            ingest_error_response(&e)
        }
    }
}

// ── POST /api/v1/documents/bulk ───────────────────────────────────────────────

pub async fn upload_bulk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let max_files = state.config.ingest.max_batch_files;

    let mut files: Vec<BatchFile> = Vec::new();
    let mut ctx = BatchContext::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_body(StatusCode::BAD_REQUEST, format!("bad multipart: {e}")),
        };

        match field.name().unwrap_or("") {
            "files" | "file" => {
                if files.len() >= max_files {
                    return error_body(
                        StatusCode::BAD_REQUEST,
                        format!("too many files (max {max_files})"),
                    );
                }
                let original_name = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => files.push(BatchFile {
                        original_name,
                        bytes: bytes.to_vec(),
                    }),
                    Err(e) => {
                        return error_body(
                            StatusCode::BAD_REQUEST,
                            format!("reading upload: {e}"),
                        )
                    }
                }
            }
            "owner" => ctx.owner = read_text(field).await,
            "course" => ctx.course_code = read_text(field).await,
            "subject" => ctx.subject_code = read_text(field).await,
            "access" => {
                if let Some(raw) = read_text(field).await {
                    match serde_json::from_str(&raw) {
                        Ok(parsed) => ctx.access = parsed,
                        Err(e) => {
                            return error_body(
                                StatusCode::BAD_REQUEST,
                                format!("bad access template: {e}"),
                            )
                        }
                    }
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    // The only batch-level failure: a request with no files at all.
    if files.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "no files provided");
    }

    let total = files.len();
    let results = batch::run(state, files, ctx).await;

    Json(BulkUploadResponse {
        message: format!(
            "Processed {} files: {} successful, {} failed",
            total,
            results.successful.len(),
            results.failed.len()
        ),
        results,
    })
    .into_response()
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Option<String> {
    field
        .text()
        .await
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
