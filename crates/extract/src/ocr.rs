//! OCR fallback for documents with no extractable text layer.
//!
//! The production engine shells out to `pdftoppm` (page rasterisation) and
//! `tesseract` (recognition). Both are invoked per file in a scratch
//! directory; neither is linked in, so a missing binary degrades instead of
//! failing the build or the pipeline.
//!
//! Contract: [`OcrEngine::recognize`] never errors. Any failure returns an
//! empty outcome with `success = false` so the caller can still persist a
//! document that simply is not searchable.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

use lectern_common::kind::DocKind;

#[derive(Debug)]
pub struct OcrRequest<'a> {
    pub bytes: &'a [u8],
    pub kind: DocKind,
    /// Tesseract language selector, e.g. "eng".
    pub language: &'a str,
    /// Upper bound on pages rasterised — not a target; shorter documents
    /// process fewer.
    pub max_pages: usize,
}

#[derive(Debug, Clone, Default)]
pub struct OcrOutcome {
    pub text: String,
    pub success: bool,
    pub pages_processed: usize,
}

impl OcrOutcome {
    /// The degraded result: nothing recognised, pipeline continues.
    pub fn failed() -> Self {
        Self::default()
    }
}

pub trait OcrEngine: Send + Sync {
    fn recognize(&self, req: &OcrRequest<'_>) -> OcrOutcome;
}

/// Tesseract-CLI-backed engine.
pub struct TesseractCli {
    tesseract: String,
    pdftoppm: String,
}

impl TesseractCli {
    pub fn new(tesseract: impl Into<String>, pdftoppm: impl Into<String>) -> Self {
        Self {
            tesseract: tesseract.into(),
            pdftoppm: pdftoppm.into(),
        }
    }

    fn try_recognize(&self, req: &OcrRequest<'_>) -> Result<(String, usize)> {
        let scratch = tempfile::tempdir().context("creating ocr scratch dir")?;

        match req.kind {
            DocKind::Pdf => self.ocr_pdf(scratch.path(), req),
            DocKind::Image => {
                let input = scratch.path().join("page.img");
                std::fs::write(&input, req.bytes).context("writing ocr input")?;
                let text = self.run_tesseract(&input, req.language)?;
                Ok((text, 1))
            }
            other => bail!("no rasteriser for kind {:?}", other),
        }
    }

    fn ocr_pdf(&self, scratch: &Path, req: &OcrRequest<'_>) -> Result<(String, usize)> {
        let input = scratch.join("input.pdf");
        std::fs::write(&input, req.bytes).context("writing ocr input")?;
        let prefix = scratch.join("page");

        let output = Command::new(&self.pdftoppm)
            .arg("-png")
            .arg("-r")
            .arg("150")
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(req.max_pages.max(1).to_string())
            .arg(&input)
            .arg(&prefix)
            .output()
            .with_context(|| format!("running {}", self.pdftoppm))?;

        if !output.status.success() {
            bail!(
                "pdftoppm failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        // pdftoppm names pages page-1.png, page-2.png, … — collect and sort.
        let mut pages: Vec<_> = std::fs::read_dir(scratch)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|x| x == "png").unwrap_or(false))
            .collect();
        pages.sort();

        let mut texts = Vec::new();
        for page in pages.iter().take(req.max_pages) {
            texts.push(self.run_tesseract(page, req.language)?);
        }

        Ok((texts.join("\n"), texts.len()))
    }

    fn run_tesseract(&self, image: &Path, language: &str) -> Result<String> {
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .output()
            .with_context(|| format!("running {}", self.tesseract))?;

        if !output.status.success() {
            bail!(
                "tesseract failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, req: &OcrRequest<'_>) -> OcrOutcome {
        match self.try_recognize(req) {
            Ok((text, pages_processed)) => OcrOutcome {
                text,
                success: true,
                pages_processed,
            },
            Err(e) => {
                tracing::warn!(kind = ?req.kind, error = %e, "ocr failed, degrading");
                OcrOutcome::failed()
            }
        }
    }
}
