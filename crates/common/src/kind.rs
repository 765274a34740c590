use serde::{Deserialize, Serialize};

/// Coarse document category, detected from the original filename extension.
/// Drives extraction strategy selection, the served Content-Type, and
/// intake validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Pdf,
    Epub,
    /// DOC / DOCX word-processing documents.
    Document,
    Image,
    Audio,
    Video,
    Other,
}

impl DocKind {
    /// Classify by extension alone — no content sniffing.
    pub fn from_filename(name: &str) -> DocKind {
        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "pdf" => DocKind::Pdf,
            "epub" => DocKind::Epub,
            "doc" | "docx" => DocKind::Document,
            "jpg" | "jpeg" | "png" => DocKind::Image,
            "mp3" => DocKind::Audio,
            "mp4" => DocKind::Video,
            _ => DocKind::Other,
        }
    }

    /// Kinds accepted at intake. Everything else is rejected before storage.
    pub fn is_allowed(self) -> bool {
        !matches!(self, DocKind::Other)
    }

    /// Content-Type served by the delivery endpoint.
    pub fn mime(self) -> &'static str {
        match self {
            DocKind::Pdf => "application/pdf",
            DocKind::Epub => "application/epub+zip",
            DocKind::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocKind::Image => "image/jpeg",
            DocKind::Audio => "audio/mpeg",
            DocKind::Video => "video/mp4",
            DocKind::Other => "application/octet-stream",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocKind::Pdf => "pdf",
            DocKind::Epub => "epub",
            DocKind::Document => "document",
            DocKind::Image => "image",
            DocKind::Audio => "audio",
            DocKind::Video => "video",
            DocKind::Other => "other",
        }
    }

    pub fn from_str_lossy(s: &str) -> DocKind {
        match s {
            "pdf" => DocKind::Pdf,
            "epub" => DocKind::Epub,
            "document" => DocKind::Document,
            "image" => DocKind::Image,
            "audio" => DocKind::Audio,
            "video" => DocKind::Video,
            _ => DocKind::Other,
        }
    }
}
