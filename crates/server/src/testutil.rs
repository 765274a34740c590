//! Shared fixtures for server tests.

use std::sync::Arc;

use lopdf::{dictionary, Document, Object, Stream};

use lectern_common::api::AccessTemplate;
use lectern_common::config::ServerAppConfig;
use lectern_extract::ocr::{OcrEngine, OcrOutcome, OcrRequest};

use crate::ingest::IngestJob;
use crate::AppState;

/// Scripted OCR engine: returns fixed text, always fails, or panics to
/// prove it was never invoked.
pub enum FixedOcr {
    Returning(String),
    Failing,
    Panicking,
}

impl FixedOcr {
    pub fn returning(text: &str) -> Self {
        FixedOcr::Returning(text.to_string())
    }
    pub fn failing() -> Self {
        FixedOcr::Failing
    }
    pub fn panicking() -> Self {
        FixedOcr::Panicking
    }
}

impl OcrEngine for FixedOcr {
    fn recognize(&self, req: &OcrRequest<'_>) -> OcrOutcome {
        match self {
            FixedOcr::Returning(text) => OcrOutcome {
                text: text.clone(),
                success: true,
                pages_processed: req.max_pages.min(1),
            },
            FixedOcr::Failing => OcrOutcome::failed(),
            FixedOcr::Panicking => panic!("ocr engine must not be invoked in this test"),
        }
    }
}

pub fn test_state(ocr: FixedOcr) -> (tempfile::TempDir, Arc<AppState>) {
    test_state_with(ocr, |_| {})
}

pub fn test_state_with(
    ocr: FixedOcr,
    tweak: impl FnOnce(&mut ServerAppConfig),
) -> (tempfile::TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let mut config: ServerAppConfig = toml::from_str(&format!(
        r#"
        [server]
        data_dir = {:?}
        "#,
        dir.path().join("data").to_str().unwrap()
    ))
    .unwrap();
    tweak(&mut config);

    let state = AppState::init(config, Arc::new(ocr)).unwrap();
    (dir, Arc::new(state))
}

pub fn job(name: &str, bytes: Vec<u8>) -> IngestJob {
    IngestJob {
        original_name: name.to_string(),
        bytes,
        explicit_title: None,
        owner: None,
        course_code: None,
        subject_code: None,
        access: AccessTemplate::default(),
        ocr_page_budget: 5,
    }
}

/// One-page PDF with a text layer and an Info dictionary.
pub fn pdf_with_info(body: &str, title: &str, author: &str) -> Vec<u8> {
    build_pdf(body, Some((title, author)))
}

/// One-page PDF whose only content stream draws nothing — the text engine
/// succeeds but finds no text, which is what a scanned page looks like.
pub fn pdf_without_text() -> Vec<u8> {
    build_pdf("", None)
}

fn build_pdf(body: &str, info: Option<(&str, &str)>) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let content = format!("BT /F1 12 Tf 72 720 Td ({body}) Tj ET");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    });

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    });

    if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
        dict.set("Parent", pages_id);
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some((title, author)) = info {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Author" => Object::string_literal(author),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
