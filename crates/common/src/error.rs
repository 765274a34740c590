use thiserror::Error;

/// Per-file ingestion failures that reach the caller.
///
/// Only `Validation`, `StorageWrite` and `Persistence` are fatal for a file;
/// extraction and OCR failures degrade inside the pipeline and end up as a
/// `processing_error` note on the persisted document instead.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Rejected at intake — nothing was stored.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The storage adapter could not write the payload.
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    /// Structural or text extraction failed (recoverable inside the pipeline).
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// OCR failed (recoverable inside the pipeline).
    #[error("ocr failed: {0}")]
    Ocr(String),

    /// The document record could not be persisted after storage succeeded.
    /// The stored blob is orphaned and left for the external sweep.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

/// Delivery-time failures, each mapped to a distinct client-visible status.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Unknown document id or missing blob.
    #[error("not found")]
    NotFound,

    /// Malformed or unsatisfiable byte range.
    #[error("range not satisfiable")]
    RangeNotSatisfiable,

    /// Denied by the document's access policy.
    #[error("forbidden")]
    Forbidden,

    /// Anything else (I/O, db) — surfaces as a 500.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
