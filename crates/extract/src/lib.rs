//! Extraction strategies for uploaded documents.
//!
//! Two independent concerns feed one merged result: structural metadata
//! (container-level fields, no content decoding) and text extraction (the
//! actual content stream). Each format-specific engine implements the same
//! [`Extractor`] trait and produces a partial [`Extraction`]; the merge is
//! field-priority, so neither extractor is authoritative and either may
//! fail without taking the other down.

pub mod epub;
pub mod meta;
pub mod ocr;
pub mod office;
pub mod text;

#[cfg(test)]
pub(crate) mod test_pdf;

use lectern_common::kind::DocKind;

/// Structural metadata, every field optional. Populated by whichever
/// extractor got there first with a non-empty value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub keywords: Option<String>,
    pub language: Option<String>,
    /// Publication year, when a creation date was parseable.
    pub year: Option<i64>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

impl DocMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.creator.is_none()
            && self.producer.is_none()
            && self.keywords.is_none()
            && self.language.is_none()
            && self.year.is_none()
            && self.creation_date.is_none()
            && self.modification_date.is_none()
    }

    /// Take `other`'s value for every field still unset here.
    fn fill_from(&mut self, other: DocMetadata) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $(if self.$field.is_none() { self.$field = other.$field; })*
            };
        }
        fill!(
            title, author, subject, creator, producer, keywords, language,
            year, creation_date, modification_date
        );
    }
}

/// Partial result of one extraction strategy.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub metadata: DocMetadata,
    pub text: String,
    /// 0 = this strategy could not determine a page count.
    pub page_count: usize,
}

/// One extraction strategy. Strategies are tried in registration order;
/// `extract` errors degrade — the pipeline records them and moves on.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn accepts(&self, kind: DocKind) -> bool;
    fn extract(&self, bytes: &[u8]) -> anyhow::Result<Extraction>;
}

/// All registered strategies. Order matters: the structural extractor comes
/// first so its metadata and page count win the merge.
fn strategies() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(meta::StructuralExtractor),
        Box::new(text::PdfTextExtractor),
        Box::new(epub::EpubExtractor),
        Box::new(office::DocxExtractor),
    ]
}

/// Merged output of every accepting strategy, plus the failure notes the
/// pipeline folds into `processing_error`.
#[derive(Debug, Default)]
pub struct MergedExtraction {
    pub metadata: DocMetadata,
    pub text: String,
    pub page_count: usize,
    /// Number of strategies that accepted this kind and ran.
    pub attempted: usize,
    /// One note per failed strategy.
    pub errors: Vec<String>,
}

impl MergedExtraction {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// False only when every strategy that ran threw. Kinds with no
    /// applicable strategy (audio, video) are trivially processed.
    pub fn processed(&self) -> bool {
        self.attempted == 0 || self.errors.len() < self.attempted
    }
}

/// Run every strategy accepting `kind` over the payload and merge the
/// partial results. Never fails as a whole: per-strategy errors are
/// collected, not propagated.
pub fn extract_all(kind: DocKind, bytes: &[u8]) -> MergedExtraction {
    let mut merged = MergedExtraction::default();

    for strategy in strategies() {
        if !strategy.accepts(kind) {
            continue;
        }
        merged.attempted += 1;

        match strategy.extract(bytes) {
            Ok(partial) => {
                merged.metadata.fill_from(partial.metadata);
                if merged.text.trim().is_empty() && !partial.text.trim().is_empty() {
                    merged.text = partial.text;
                }
                // First strategy to report a real page count wins — with the
                // structural extractor registered first it is authoritative,
                // and the text engine is the fallback.
                if merged.page_count == 0 {
                    merged.page_count = partial.page_count;
                }
            }
            Err(e) => {
                tracing::warn!(strategy = strategy.name(), error = %e, "extraction strategy failed");
                merged.errors.push(format!("{}: {e}", strategy.name()));
            }
        }
    }

    merged
}
