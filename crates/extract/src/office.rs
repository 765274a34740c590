//! DOCX extraction: core properties plus document paragraphs.
//!
//! Legacy binary `.doc` files are not a zip container, so they fall out of
//! the first `ZipArchive::new` call as a recoverable error and the pipeline
//! stores them unextracted.

use std::io::Read;

use anyhow::Result;
use quick_xml::events::Event;

use lectern_common::kind::DocKind;

use crate::{DocMetadata, Extraction, Extractor};

pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn accepts(&self, kind: DocKind) -> bool {
        kind == DocKind::Document
    }

    fn extract(&self, bytes: &[u8]) -> Result<Extraction> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor)?;

        let mut metadata = DocMetadata::default();
        if let Ok(mut entry) = archive.by_name("docProps/core.xml") {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            metadata = parse_core_properties(&xml);
        }

        let mut paragraphs = Vec::new();
        if let Ok(mut entry) = archive.by_name("word/document.xml") {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            paragraphs = parse_paragraphs(&xml);
        }

        Ok(Extraction {
            metadata,
            text: paragraphs.join("\n"),
            // DOCX carries no reliable page count at the container level.
            page_count: 0,
        })
    }
}

/// dc:title / dc:creator / dc:subject / cp:keywords from docProps/core.xml.
fn parse_core_properties(xml: &str) -> DocMetadata {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut metadata = DocMetadata::default();
    let mut current_field: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current_field = match e.name().as_ref() {
                    b"dc:title" => Some("title"),
                    b"dc:creator" => Some("author"),
                    b"dc:subject" => Some("subject"),
                    b"cp:keywords" => Some("keywords"),
                    _ => None,
                };
            }
            Ok(Event::Text(e)) => {
                if let Some(field) = current_field.take() {
                    if let Ok(text) = e.unescape() {
                        let text = text.trim().to_string();
                        if !text.is_empty() {
                            match field {
                                "title" => metadata.title.get_or_insert(text),
                                "author" => metadata.author.get_or_insert(text),
                                "subject" => metadata.subject.get_or_insert(text),
                                _ => metadata.keywords.get_or_insert(text),
                            };
                        }
                    }
                }
            }
            Ok(Event::End(_)) => current_field = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    metadata
}

/// Non-empty paragraphs from word/document.xml (`w:p` blocks, `w:t` runs).
fn parse_paragraphs(xml: &str) -> Vec<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_t = true,
                b"w:p" => current.clear(),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_t = false,
                b"w:p" => {
                    let text = current.trim().to_string();
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_t {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn build_docx(core_xml: &str, document_xml: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let opts = zip::write::SimpleFileOptions::default();

        zip.start_file("docProps/core.xml", opts).unwrap();
        zip.write_all(core_xml.as_bytes()).unwrap();
        zip.start_file("word/document.xml", opts).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();

        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_core_properties_and_paragraphs() {
        let docx = build_docx(
            r#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>Lab Protocol</dc:title>
  <dc:creator>S. Weber</dc:creator>
  <cp:keywords>chemistry, safety</cp:keywords>
</cp:coreProperties>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Step one: prepare the solution.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Step </w:t></w:r><w:r><w:t>two.</w:t></w:r></w:p>
    <w:p><w:r><w:t>   </w:t></w:r></w:p>
  </w:body>
</w:document>"#,
        );

        let out = DocxExtractor.extract(&docx).unwrap();
        assert_eq!(out.metadata.title.as_deref(), Some("Lab Protocol"));
        assert_eq!(out.metadata.author.as_deref(), Some("S. Weber"));
        assert_eq!(out.metadata.keywords.as_deref(), Some("chemistry, safety"));
        assert_eq!(out.text, "Step one: prepare the solution.\nStep two.");
        assert_eq!(out.page_count, 0);
    }

    #[test]
    fn legacy_doc_bytes_error_cleanly() {
        // A binary .doc is not a zip container.
        let doc = [0xD0u8, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0];
        assert!(DocxExtractor.extract(&doc).is_err());
    }

    #[test]
    fn missing_parts_yield_empty_result() {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("unrelated.txt", opts).unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let out = DocxExtractor.extract(&bytes).unwrap();
        assert!(out.metadata.is_empty());
        assert!(out.text.is_empty());
    }
}
