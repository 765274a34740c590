//! Bulk ingestion with per-file isolation.
//!
//! Each file runs its own orchestrator pipeline under a semaphore-bounded
//! worker pool; results are joined from the task handles, so one corrupt or
//! rejected file can never abort the batch and no outcome can be lost.

use std::sync::Arc;

use tokio::sync::Semaphore;

use lectern_common::api::{AccessTemplate, BulkFailure, BulkResults, BulkSuccess};

use crate::ingest::{self, IngestJob};
use crate::AppState;

pub struct BatchFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// Shared classification hints and access template, applied uniformly to
/// every file in the batch.
#[derive(Clone, Default)]
pub struct BatchContext {
    pub owner: Option<String>,
    pub course_code: Option<String>,
    pub subject_code: Option<String>,
    pub access: AccessTemplate,
}

pub async fn run(state: Arc<AppState>, files: Vec<BatchFile>, ctx: BatchContext) -> BulkResults {
    let workers = state.config.ingest.workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let ocr_page_budget = state.config.ingest.ocr_pages_bulk;

    let mut names = Vec::with_capacity(files.len());
    let mut handles = Vec::with_capacity(files.len());

    for file in files {
        names.push(file.original_name.clone());

        let state = state.clone();
        let semaphore = semaphore.clone();
        let ctx = ctx.clone();

        handles.push(tokio::spawn(async move {
            // The semaphore is never closed; a failed acquire just means we
            // run unthrottled.
            let _permit = semaphore.acquire_owned().await.ok();

            let name = file.original_name.clone();
            let job = IngestJob {
                original_name: file.original_name,
                bytes: file.bytes,
                explicit_title: None,
                owner: ctx.owner,
                course_code: ctx.course_code,
                subject_code: ctx.subject_code,
                access: ctx.access,
                ocr_page_budget,
            };

            match ingest::ingest_file(&state, job).await {
                Ok(outcome) => Ok(BulkSuccess {
                    original_name: name,
                    title: outcome.document.title,
                    pdf_id: outcome.document.id,
                    processed: outcome.document.processed,
                }),
                Err(e) => Err(BulkFailure {
                    original_name: name,
                    error: e.to_string(),
                }),
            }
        }));
    }

    let mut results = BulkResults {
        successful: Vec::new(),
        failed: Vec::new(),
    };

    for (handle, name) in handles.into_iter().zip(names) {
        match handle.await {
            Ok(Ok(success)) => results.successful.push(success),
            Ok(Err(failure)) => results.failed.push(failure),
            Err(e) => {
                // A panicked pipeline task still accounts for its file.
                tracing::error!(file = %name, error = %e, "ingest task crashed");
                results.failed.push(BulkFailure {
                    original_name: name,
                    error: format!("internal error: {e}"),
                });
            }
        }
    }

    tracing::info!(
        successful = results.successful.len(),
        failed = results.failed.len(),
        "batch ingest complete"
    );
    results
}
