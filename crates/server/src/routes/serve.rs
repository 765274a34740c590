use std::io::{self, SeekFrom};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::task::spawn_blocking;
use tokio_util::io::ReaderStream;

use lectern_common::api::DocumentRecord;
use lectern_common::error::DeliveryError;

use crate::{db, AppState};

use super::error_body;

// ── GET /api/v1/documents/{id} ────────────────────────────────────────────────

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    match load_record(&state, id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_body(StatusCode::NOT_FOUND, "document not found"),
        Err(e) => {
            tracing::error!("get_document: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ── GET /api/v1/documents/{id}/content ────────────────────────────────────────

#[derive(Deserialize)]
pub struct ServeParams {
    #[serde(default)]
    pub download: Option<String>,
}

impl ServeParams {
    fn wants_download(&self) -> bool {
        matches!(self.download.as_deref(), Some("1") | Some("true") | Some("yes"))
    }
}

pub async fn serve_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ServeParams>,
    headers: HeaderMap,
) -> Response {
    let record = match load_record(&state, id).await {
        Ok(Some(record)) => record,
        Ok(None) => return error_body(StatusCode::NOT_FOUND, "document not found"),
        Err(e) => {
            tracing::error!("serve_content: {e:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let download = params.wants_download();
    if download && !record.access.allow_download {
        // Access-policy denial stays distinct from 404 and 416. The full
        // policy (institutes, viewer limits, expiry) is the external
        // authorizer's job; the download flag is checked here because it
        // lives on the record we just loaded.
        return error_body(StatusCode::FORBIDDEN, "download not permitted");
    }

    let (file, length) = match state.store.open(&record.storage_name) {
        Ok(pair) => pair,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // Record without blob: orphaned the other way round. Distinct
            // from a malformed request.
            tracing::error!(id, locator = %record.storage_name, "stored blob missing");
            return error_body(StatusCode::NOT_FOUND, "stored content missing");
        }
        Err(e) => {
            tracing::error!("opening blob: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut out = HeaderMap::new();
    out.insert(header::CONTENT_TYPE, HeaderValue::from_static(record.kind.mime()));
    out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    out.insert(
        header::CONTENT_DISPOSITION,
        disposition_value(download, &record.original_name),
    );

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    match range {
        None => {
            out.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            match span_body(file, 0, length).await {
                Ok(body) => (StatusCode::OK, out, body).into_response(),
                Err(e) => {
                    tracing::error!("streaming blob: {e}");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Some(raw) => match parse_range(raw, length) {
            Ok((start, end)) => {
                let span = end - start + 1;
                out.insert(
                    header::CONTENT_RANGE,
                    header_value(format!("bytes {start}-{end}/{length}")),
                );
                out.insert(header::CONTENT_LENGTH, HeaderValue::from(span));
                match span_body(file, start, span).await {
                    Ok(body) => (StatusCode::PARTIAL_CONTENT, out, body).into_response(),
                    Err(e) => {
                        tracing::error!("streaming blob span: {e}");
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    }
                }
            }
            Err(_) => {
                out.insert(
                    header::CONTENT_RANGE,
                    header_value(format!("bytes */{length}")),
                );
                (StatusCode::RANGE_NOT_SATISFIABLE, out).into_response()
            }
        },
    }
}

// ── Range parsing ─────────────────────────────────────────────────────────────

/// Parse `bytes=start-end` against a resource of `length` bytes.
///
/// `end` defaults to `length - 1` when omitted and is clamped to it when it
/// overshoots. Anything unparsable, `start > end`, or `start >= length` is
/// unsatisfiable — kept distinct from NotFound by the caller.
pub(crate) fn parse_range(header: &str, length: u64) -> Result<(u64, u64), DeliveryError> {
    let spec = header
        .strip_prefix("bytes=")
        .ok_or(DeliveryError::RangeNotSatisfiable)?;
    let (start_s, end_s) = spec
        .split_once('-')
        .ok_or(DeliveryError::RangeNotSatisfiable)?;

    let start: u64 = start_s
        .trim()
        .parse()
        .map_err(|_| DeliveryError::RangeNotSatisfiable)?;

    let end = if end_s.trim().is_empty() {
        length.saturating_sub(1)
    } else {
        end_s
            .trim()
            .parse()
            .map_err(|_| DeliveryError::RangeNotSatisfiable)?
    };
    let end = end.min(length.saturating_sub(1));

    if length == 0 || start > end || start >= length {
        return Err(DeliveryError::RangeNotSatisfiable);
    }
    Ok((start, end))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn load_record(state: &Arc<AppState>, id: i64) -> anyhow::Result<Option<DocumentRecord>> {
    let db_path = state.db_path.clone();
    spawn_blocking(move || {
        let conn = db::open(&db_path)?;
        db::get_document(&conn, id)
    })
    .await
    .unwrap_or_else(|e| Err(anyhow::anyhow!(e)))
}

/// Stream `span` bytes of `file` starting at `start`.
async fn span_body(file: std::fs::File, start: u64, span: u64) -> io::Result<Body> {
    let mut file = tokio::fs::File::from_std(file);
    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    Ok(Body::from_stream(ReaderStream::new(file.take(span))))
}

fn disposition_value(download: bool, original_name: &str) -> HeaderValue {
    if download {
        let safe = original_name.replace(['"', '\r', '\n'], "_");
        header_value(format!("attachment; filename=\"{safe}\""))
    } else {
        HeaderValue::from_static("inline")
    }
}

fn header_value(s: String) -> HeaderValue {
    HeaderValue::from_str(&s).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
}
