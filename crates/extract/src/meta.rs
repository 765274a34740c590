//! Structural metadata extraction for PDFs.
//!
//! Reads the trailer Info dictionary and the page tree without decoding any
//! content stream, so an encrypted or otherwise unreadable text layer still
//! yields metadata. Parse failures degrade: the caller records the error and
//! continues with an empty record.

use anyhow::{anyhow, Result};
use lopdf::{Dictionary, Document, Object};

use lectern_common::kind::DocKind;

use crate::{DocMetadata, Extraction, Extractor};

pub struct StructuralExtractor;

impl Extractor for StructuralExtractor {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn accepts(&self, kind: DocKind) -> bool {
        kind == DocKind::Pdf
    }

    fn extract(&self, bytes: &[u8]) -> Result<Extraction> {
        let doc = Document::load_mem(bytes).map_err(|e| anyhow!("pdf parse: {e}"))?;

        if doc.is_encrypted() {
            // Permissive mode: string values may be unreadable but the page
            // tree usually is not. Take whatever decodes.
            tracing::debug!("encrypted pdf, extracting accessible structure only");
        }

        let page_count = doc.get_pages().len();

        let mut metadata = DocMetadata::default();
        if let Some(info) = info_dict(&doc) {
            metadata.title = string_field(info, b"Title");
            metadata.author = string_field(info, b"Author");
            metadata.subject = string_field(info, b"Subject");
            metadata.creator = string_field(info, b"Creator");
            metadata.producer = string_field(info, b"Producer");
            metadata.keywords = string_field(info, b"Keywords");
            metadata.creation_date = string_field(info, b"CreationDate");
            metadata.modification_date = string_field(info, b"ModDate");
            metadata.year = metadata.creation_date.as_deref().and_then(date_year);
        }

        Ok(Extraction {
            metadata,
            text: String::new(),
            page_count,
        })
    }
}

/// The trailer Info entry, following one level of indirection if present.
fn info_dict(doc: &Document) -> Option<&Dictionary> {
    let obj = doc.trailer.get(b"Info").ok()?;
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    obj.as_dict().ok()
}

/// A string-valued Info field, decoded and trimmed; None when absent,
/// unreadable, or empty.
fn string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            let s = decode_pdf_string(bytes);
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    }
}

/// The year of a `D:YYYYMMDDHHmmSS…` PDF date. Some producers omit the
/// `D:` prefix.
fn date_year(date: &str) -> Option<i64> {
    let digits = date.strip_prefix("D:").unwrap_or(date);
    let head = digits.get(..4)?;
    head.parse().ok().filter(|y| (1000..=9999).contains(y))
}

/// PDF text strings are UTF-16BE when they carry the FE FF BOM, otherwise
/// effectively Latin-1 (PDFDocEncoding's printable range matches).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf;

    #[test]
    fn reads_info_dictionary_and_page_count() {
        let pdf = test_pdf::build(
            &["Page one body text", "Page two body text"],
            Some(test_pdf::Info {
                title: "Circuit Analysis",
                author: "R. Okafor",
                subject: "EE201",
            }),
        );

        let out = StructuralExtractor.extract(&pdf).unwrap();
        assert_eq!(out.page_count, 2);
        assert_eq!(out.metadata.title.as_deref(), Some("Circuit Analysis"));
        assert_eq!(out.metadata.author.as_deref(), Some("R. Okafor"));
        assert_eq!(out.metadata.subject.as_deref(), Some("EE201"));
        assert!(out.text.is_empty(), "structural extraction decodes no text");
    }

    #[test]
    fn missing_info_yields_empty_metadata() {
        let pdf = test_pdf::build(&["Just a page"], None);
        let out = StructuralExtractor.extract(&pdf).unwrap();
        assert!(out.metadata.is_empty());
        assert_eq!(out.page_count, 1);
    }

    #[test]
    fn garbage_bytes_error_cleanly() {
        assert!(StructuralExtractor.extract(b"not a pdf at all").is_err());
    }

    #[test]
    fn date_year_parses_pdf_dates() {
        assert_eq!(date_year("D:20240115093000Z"), Some(2024));
        assert_eq!(date_year("19991231"), Some(1999));
        assert_eq!(date_year("D:99"), None);
        assert_eq!(date_year("not a date"), None);
    }

    #[test]
    fn utf16_strings_decode() {
        // "Ω" as UTF-16BE with BOM
        let bytes = [0xFE, 0xFF, 0x03, 0xA9];
        assert_eq!(decode_pdf_string(&bytes), "Ω");
    }

    #[test]
    fn latin1_strings_decode() {
        let bytes = [b'C', b'a', b'f', 0xE9];
        assert_eq!(decode_pdf_string(&bytes), "Café");
    }

    #[test]
    fn blank_info_fields_become_none() {
        let pdf = test_pdf::build(
            &["body"],
            Some(test_pdf::Info {
                title: "   ",
                author: "A",
                subject: "",
            }),
        );
        let out = StructuralExtractor.extract(&pdf).unwrap();
        assert_eq!(out.metadata.title, None);
        assert_eq!(out.metadata.author.as_deref(), Some("A"));
        assert_eq!(out.metadata.subject, None);
    }

    #[test]
    fn accepts_only_pdf() {
        assert!(StructuralExtractor.accepts(DocKind::Pdf));
        assert!(!StructuralExtractor.accepts(DocKind::Epub));
        assert!(!StructuralExtractor.accepts(DocKind::Image));
    }
}
