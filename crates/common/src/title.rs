/// Longest title taken from the first line of extracted text.
const MAX_TEXT_TITLE_CHARS: usize = 100;

/// A text line must be longer than this (trimmed) to be usable as a title —
/// guards against noise lines like page numbers or single characters.
const MIN_TEXT_TITLE_CHARS: usize = 5;

/// Derive a display title from whatever the extractors produced.
///
/// Priority, first non-empty wins:
///   1. structural metadata title;
///   2. first line of extracted (or OCR) text, truncated to 100 chars,
///      accepted only if its trimmed length exceeds 5 chars;
///   3. the original filename, extension stripped, `_`/`-` → spaces.
///
/// Deterministic and side-effect-free; never returns an empty string for a
/// non-empty filename.
pub fn resolve(metadata_title: Option<&str>, extracted_text: &str, original_filename: &str) -> String {
    if let Some(title) = metadata_title {
        let title = title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
    }

    if let Some(line) = extracted_text.lines().next() {
        let line = line.trim();
        if line.chars().count() > MIN_TEXT_TITLE_CHARS {
            return line.chars().take(MAX_TEXT_TITLE_CHARS).collect();
        }
    }

    let fallback = sanitize_filename(original_filename);
    if !fallback.is_empty() {
        return fallback;
    }
    // Separator-only names sanitize to nothing; keep the raw name rather
    // than returning an empty title.
    let raw = original_filename.trim();
    if raw.is_empty() {
        "untitled".to_string()
    } else {
        raw.to_string()
    }
}

/// Filename fallback: strip the extension, replace `_`/`-` with spaces, trim.
fn sanitize_filename(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    stem.replace(['_', '-'], " ").trim().to_string()
}
