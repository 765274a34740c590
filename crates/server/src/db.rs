use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use lectern_common::api::{AccessTemplate, DocMetadataBlock, DocumentRecord};
use lectern_common::kind::DocKind;

// ── Schema ────────────────────────────────────────────────────────────────────

pub fn open(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("initialising schema")?;
    Ok(conn)
}

// ── Insert ────────────────────────────────────────────────────────────────────

/// Everything the orchestrator persists for one ingested file.
/// `is_searchable` is derived at insert time, never supplied.
#[derive(Debug)]
pub struct NewDocument {
    pub storage_name: String,
    pub original_name: String,
    pub size: i64,
    pub kind: DocKind,
    pub owner: Option<String>,
    pub course_code: Option<String>,
    pub subject_code: Option<String>,
    pub access: AccessTemplate,
    pub title: String,
    pub metadata: DocMetadataBlock,
    pub full_text: String,
    pub ocr_text: String,
    pub page_count: i64,
    pub processed: bool,
    pub processing_error: Option<String>,
    pub uploaded_at: i64,
}

pub fn insert_document(conn: &Connection, doc: &NewDocument) -> Result<i64> {
    let is_searchable =
        !doc.full_text.trim().is_empty() || !doc.ocr_text.trim().is_empty();

    let allowed_institutes = doc
        .access
        .allowed_institutes
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("encoding allowed_institutes")?;

    let id = conn.query_row(
        "INSERT INTO documents (
            storage_name, original_name, size, kind, owner, course_code, subject_code,
            is_protected, allow_download, view_only, watermark_text,
            time_limit_minutes, allowed_institutes, max_concurrent_viewers,
            title, author, subject, creator, producer, keywords, language, year,
            meta_created, meta_modified,
            full_text, ocr_text, is_searchable, page_count,
            processed, processing_error, uploaded_at
         ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11,
            ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22,
            ?23, ?24,
            ?25, ?26, ?27, ?28,
            ?29, ?30, ?31
         )
         RETURNING id",
        params![
            doc.storage_name,
            doc.original_name,
            doc.size,
            doc.kind.as_str(),
            doc.owner,
            doc.course_code,
            doc.subject_code,
            doc.access.is_protected,
            doc.access.allow_download,
            doc.access.view_only,
            doc.access.watermark_text,
            doc.access.time_limit_minutes,
            allowed_institutes,
            doc.access.max_concurrent_viewers,
            doc.title,
            doc.metadata.author,
            doc.metadata.subject,
            doc.metadata.creator,
            doc.metadata.producer,
            doc.metadata.keywords,
            doc.metadata.language,
            doc.metadata.year,
            doc.metadata.meta_created,
            doc.metadata.meta_modified,
            doc.full_text,
            doc.ocr_text,
            is_searchable,
            doc.page_count,
            doc.processed,
            doc.processing_error,
            doc.uploaded_at,
        ],
        |row| row.get::<_, i64>(0),
    )?;

    Ok(id)
}

// ── Lookup ────────────────────────────────────────────────────────────────────

const RECORD_COLUMNS: &str = "id, storage_name, original_name, size, kind, owner,
    course_code, subject_code,
    is_protected, allow_download, view_only, watermark_text,
    time_limit_minutes, allowed_institutes, max_concurrent_viewers,
    title, author, subject, creator, producer, keywords, language, year,
    meta_created, meta_modified,
    full_text, ocr_text, is_searchable, page_count,
    processed, processing_error, version, parent_id, uploaded_at";

pub fn get_document(conn: &Connection, id: i64) -> Result<Option<DocumentRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM documents WHERE id = ?1"),
        params![id],
        row_to_record,
    )
    .optional()
    .map_err(Into::into)
}

/// Reserved for the external document-management collaborator, which must
/// also delete the stored blob via the content store.
#[allow(dead_code)]
pub fn delete_document(conn: &Connection, id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
    Ok(n > 0)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let allowed_institutes: Option<String> = row.get(13)?;
    Ok(DocumentRecord {
        id: row.get(0)?,
        storage_name: row.get(1)?,
        original_name: row.get(2)?,
        size: row.get(3)?,
        kind: DocKind::from_str_lossy(&row.get::<_, String>(4)?),
        owner: row.get(5)?,
        course_code: row.get(6)?,
        subject_code: row.get(7)?,
        access: AccessTemplate {
            is_protected: row.get(8)?,
            allow_download: row.get(9)?,
            view_only: row.get(10)?,
            watermark_text: row.get(11)?,
            time_limit_minutes: row.get(12)?,
            allowed_institutes: allowed_institutes
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            max_concurrent_viewers: row.get(14)?,
        },
        title: row.get(15)?,
        metadata: DocMetadataBlock {
            author: row.get(16)?,
            subject: row.get(17)?,
            creator: row.get(18)?,
            producer: row.get(19)?,
            keywords: row.get(20)?,
            language: row.get(21)?,
            year: row.get(22)?,
            meta_created: row.get(23)?,
            meta_modified: row.get(24)?,
        },
        full_text: row.get(25)?,
        ocr_text: row.get(26)?,
        is_searchable: row.get(27)?,
        page_count: row.get(28)?,
        processed: row.get(29)?,
        processing_error: row.get(30)?,
        version: row.get(31)?,
        parent_id: row.get(32)?,
        uploaded_at: row.get(33)?,
    })
}
