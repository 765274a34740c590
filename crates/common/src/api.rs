use serde::{Deserialize, Serialize};

use crate::kind::DocKind;

/// Access-control template attached to an upload. Configuration data the
/// delivery layer consumes; this pipeline stores it verbatim.
/// Field names follow the upstream wire contract (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessTemplate {
    pub is_protected: bool,
    #[serde(default = "default_true")]
    pub allow_download: bool,
    pub view_only: bool,
    pub watermark_text: Option<String>,
    pub time_limit_minutes: Option<i64>,
    pub allowed_institutes: Option<Vec<String>>,
    pub max_concurrent_viewers: Option<i64>,
}

fn default_true() -> bool {
    true
}

/// The persisted document record, as served to external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: i64,
    pub storage_name: String,
    pub original_name: String,
    pub size: i64,
    pub kind: DocKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_code: Option<String>,
    #[serde(flatten)]
    pub access: AccessTemplate,
    pub title: String,
    #[serde(flatten)]
    pub metadata: DocMetadataBlock,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub full_text: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub ocr_text: String,
    pub is_searchable: bool,
    pub page_count: i64,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub uploaded_at: i64,
}

/// Optional metadata fields, each populated by whichever extractor succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DocMetadataBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_modified: Option<String>,
}

/// POST /api/v1/documents response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub document: DocumentRecord,
    pub processing_info: ProcessingInfo,
}

/// Summary of what the pipeline managed to do for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingInfo {
    pub metadata_extracted: bool,
    pub ocr_performed: bool,
    pub is_searchable: bool,
}

/// One successfully ingested file in a bulk response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSuccess {
    pub original_name: String,
    pub title: String,
    /// Upstream wire name for the created document id.
    #[serde(rename = "pdfId")]
    pub pdf_id: i64,
    pub processed: bool,
}

/// One failed file in a bulk response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub original_name: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResults {
    pub successful: Vec<BulkSuccess>,
    pub failed: Vec<BulkFailure>,
}

/// POST /api/v1/documents/bulk response. The batch itself always succeeds
/// if any files were present; per-file outcomes live in `results`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkUploadResponse {
    pub message: String,
    pub results: BulkResults,
}
