//! Per-file ingestion orchestration.
//!
//! State machine per file: Received → Stored → Extracted → (OcrPending →
//! OcrDone |) → Titled → Persisted. Only the storage write and the final
//! persistence can fail the file; every extraction sub-step degrades into a
//! document with partial metadata and a `processing_error` note.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::spawn_blocking;

use lectern_common::api::{AccessTemplate, DocMetadataBlock, DocumentRecord, ProcessingInfo};
use lectern_common::error::IngestError;
use lectern_common::kind::DocKind;
use lectern_common::title;
use lectern_extract::ocr::{OcrOutcome, OcrRequest};
use lectern_extract::{extract_all, MergedExtraction};

use crate::{db, AppState};

pub struct IngestJob {
    pub original_name: String,
    pub bytes: Vec<u8>,
    /// Caller-supplied title; when present it wins over the resolver.
    pub explicit_title: Option<String>,
    pub owner: Option<String>,
    pub course_code: Option<String>,
    pub subject_code: Option<String>,
    pub access: AccessTemplate,
    /// OCR page budget for this job — bulk uploads pass a smaller one.
    pub ocr_page_budget: usize,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub document: DocumentRecord,
    pub info: ProcessingInfo,
}

pub async fn ingest_file(
    state: &Arc<AppState>,
    job: IngestJob,
) -> Result<IngestOutcome, IngestError> {
    let cfg = &state.config.ingest;
    let kind = DocKind::from_filename(&job.original_name);

    // ── Received: intake validation, before anything touches disk ──────────
    if job.bytes.is_empty() {
        return Err(IngestError::Validation("empty file".into()));
    }
    if !kind.is_allowed() {
        return Err(IngestError::Validation(format!(
            "unsupported file type: {}",
            job.original_name
        )));
    }
    if job.bytes.len() as u64 > cfg.max_file_bytes() {
        return Err(IngestError::Validation(format!(
            "file exceeds {} MB limit",
            cfg.max_file_mb
        )));
    }

    let bytes = Arc::new(job.bytes);
    let size = bytes.len() as i64;

    // ── Received → Stored ───────────────────────────────────────────────────
    let locator = {
        let state = state.clone();
        let bytes = bytes.clone();
        let name = job.original_name.clone();
        spawn_blocking(move || state.store.store(&bytes, &name))
            .await
            .map_err(|e| IngestError::StorageWrite(e.to_string()))?
            .map_err(|e| IngestError::StorageWrite(e.to_string()))?
    };
    tracing::debug!(original = %job.original_name, locator = %locator, size, "stored upload");

    // ── Stored → Extracted ──────────────────────────────────────────────────
    // Either strategy may fail on its own; failures land in `errors`, not here.
    let merged: MergedExtraction = {
        let bytes = bytes.clone();
        match spawn_blocking(move || extract_all(kind, &bytes)).await {
            Ok(m) => m,
            Err(e) => MergedExtraction {
                attempted: 1,
                errors: vec![format!("extraction task: {e}")],
                ..Default::default()
            },
        }
    };
    let mut notes = merged.errors.clone();

    // ── Extracted → OcrPending → OcrDone ────────────────────────────────────
    // Entered only when configured on, no text layer was found, and the kind
    // can be rasterised. OCR never fails the file: errors and timeouts both
    // degrade to a non-searchable document.
    let ocr_eligible = matches!(kind, DocKind::Pdf | DocKind::Image);
    let mut ocr_performed = false;
    let mut ocr = OcrOutcome::default();

    if cfg.ocr_if_needed && ocr_eligible && !merged.has_text() {
        ocr_performed = true;
        let fut = {
            let state = state.clone();
            let bytes = bytes.clone();
            let language = cfg.ocr_language.clone();
            let max_pages = job.ocr_page_budget;
            spawn_blocking(move || {
                state.ocr.recognize(&OcrRequest {
                    bytes: &bytes,
                    kind,
                    language: &language,
                    max_pages,
                })
            })
        };

        match tokio::time::timeout(Duration::from_secs(cfg.ocr_timeout_secs), fut).await {
            Ok(Ok(outcome)) => {
                if !outcome.success {
                    notes.push("ocr: recognition failed".into());
                }
                ocr = outcome;
            }
            Ok(Err(e)) => notes.push(format!("ocr task: {e}")),
            Err(_) => {
                tracing::warn!(original = %job.original_name, "ocr timed out, degrading");
                notes.push(format!("ocr: timed out after {}s", cfg.ocr_timeout_secs));
            }
        }
    }

    // ── → Titled ────────────────────────────────────────────────────────────
    let text_for_title = if merged.has_text() { &merged.text } else { &ocr.text };
    let title = job
        .explicit_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .unwrap_or_else(|| {
            title::resolve(
                merged.metadata.title.as_deref(),
                text_for_title,
                &job.original_name,
            )
        });

    // ── Titled → Persisted ──────────────────────────────────────────────────
    let metadata_extracted = !merged.metadata.is_empty();
    let processed = merged.processed();
    let new_doc = db::NewDocument {
        storage_name: locator.clone(),
        original_name: job.original_name.clone(),
        size,
        kind,
        owner: job.owner,
        course_code: job.course_code,
        subject_code: job.subject_code,
        access: job.access,
        title,
        metadata: DocMetadataBlock {
            author: merged.metadata.author,
            subject: merged.metadata.subject,
            creator: merged.metadata.creator,
            producer: merged.metadata.producer,
            keywords: merged.metadata.keywords,
            language: merged.metadata.language,
            year: merged.metadata.year,
            meta_created: merged.metadata.creation_date,
            meta_modified: merged.metadata.modification_date,
        },
        full_text: merged.text,
        ocr_text: ocr.text,
        page_count: merged.page_count as i64,
        processed,
        processing_error: if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        },
        uploaded_at: chrono::Utc::now().timestamp(),
    };

    let document = {
        let db_path = state.db_path.clone();
        spawn_blocking(move || -> anyhow::Result<DocumentRecord> {
            let conn = db::open(&db_path)?;
            let id = db::insert_document(&conn, &new_doc)?;
            db::get_document(&conn, id)?
                .ok_or_else(|| anyhow::anyhow!("just-inserted document {id} missing"))
        })
        .await
        .map_err(|e| IngestError::Persistence(e.to_string()))?
        .map_err(|e| {
            // The blob stays on disk; the external orphan sweep reconciles it.
            tracing::warn!(locator = %locator, error = %e, "document insert failed, stored blob orphaned");
            IngestError::Persistence(e.to_string())
        })?
    };

    tracing::info!(
        id = document.id,
        kind = kind.as_str(),
        pages = document.page_count,
        searchable = document.is_searchable,
        processed = document.processed,
        ocr = ocr_performed,
        "ingested {}",
        document.original_name
    );

    Ok(IngestOutcome {
        info: ProcessingInfo {
            metadata_extracted,
            ocr_performed,
            is_searchable: document.is_searchable,
        },
        document,
    })
}
