//! PDF text-layer extraction.

use anyhow::{anyhow, bail, Result};

use lectern_common::kind::DocKind;

use crate::{Extraction, Extractor};

pub struct PdfTextExtractor;

impl Extractor for PdfTextExtractor {
    fn name(&self) -> &'static str {
        "pdf-text"
    }

    fn accepts(&self, kind: DocKind) -> bool {
        kind == DocKind::Pdf
    }

    fn extract(&self, bytes: &[u8]) -> Result<Extraction> {
        // pdf-extract can panic on malformed PDFs; catch_unwind turns that
        // into a recoverable error so the rest of the pipeline continues.
        let result =
            std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));

        let pages = match result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => bail!("pdf text extraction: {e}"),
            Err(_) => return Err(anyhow!("pdf text extraction panicked")),
        };

        let page_count = pages.len();
        let text = pages.join("\n");

        Ok(Extraction {
            metadata: Default::default(),
            text,
            page_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf;

    #[test]
    fn extracts_text_and_page_count() {
        let pdf = test_pdf::build(&["Hello from page one", "And page two"], None);
        let out = PdfTextExtractor.extract(&pdf).unwrap();
        assert_eq!(out.page_count, 2);
        assert!(out.text.contains("page one"), "{}", out.text);
        assert!(out.text.contains("page two"), "{}", out.text);
    }

    #[test]
    fn invalid_pdf_is_an_error_not_a_panic() {
        assert!(PdfTextExtractor.extract(b"not a pdf").is_err());
    }

    #[test]
    fn accepts_only_pdf() {
        assert!(PdfTextExtractor.accepts(DocKind::Pdf));
        assert!(!PdfTextExtractor.accepts(DocKind::Document));
    }
}
