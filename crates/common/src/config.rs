use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAppConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub data_dir: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}

/// Ingestion pipeline knobs. Everything has a default so a minimal config
/// file only needs `[server] data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Per-file size cap in megabytes, enforced before storage.
    #[serde(default = "default_max_file_mb")]
    pub max_file_mb: u64,

    /// Maximum number of files in one bulk upload.
    #[serde(default = "default_max_batch_files")]
    pub max_batch_files: usize,

    /// Bounded parallelism for batch ingestion.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Run OCR when a document has no extractable text layer.
    #[serde(default = "default_true")]
    pub ocr_if_needed: bool,

    /// Tesseract language selector.
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// OCR page budget for single uploads.
    #[serde(default = "default_ocr_pages_single")]
    pub ocr_pages_single: usize,

    /// OCR page budget for bulk uploads — smaller, to bound batch latency.
    #[serde(default = "default_ocr_pages_bulk")]
    pub ocr_pages_bulk: usize,

    /// Hard ceiling on one file's OCR run; on expiry the file degrades to
    /// non-searchable instead of failing.
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,

    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,

    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_file_mb: default_max_file_mb(),
            max_batch_files: default_max_batch_files(),
            workers: default_workers(),
            ocr_if_needed: true,
            ocr_language: default_ocr_language(),
            ocr_pages_single: default_ocr_pages_single(),
            ocr_pages_bulk: default_ocr_pages_bulk(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
            tesseract_path: default_tesseract_path(),
            pdftoppm_path: default_pdftoppm_path(),
        }
    }
}

impl IngestSettings {
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_mb * 1024 * 1024
    }
}

fn default_max_file_mb() -> u64 { 50 }
fn default_max_batch_files() -> usize { 20 }
fn default_workers() -> usize { 4 }
fn default_true() -> bool { true }
fn default_ocr_language() -> String { "eng".into() }
fn default_ocr_pages_single() -> usize { 10 }
fn default_ocr_pages_bulk() -> usize { 3 }
fn default_ocr_timeout_secs() -> u64 { 60 }
fn default_tesseract_path() -> String { "tesseract".into() }
fn default_pdftoppm_path() -> String { "pdftoppm".into() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: ServerAppConfig = toml::from_str(
            r#"
            [server]
            data_dir = "/var/lib/lectern"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.ingest.max_file_mb, 50);
        assert_eq!(cfg.ingest.max_batch_files, 20);
        assert!(cfg.ingest.ocr_if_needed);
        assert_eq!(cfg.ingest.ocr_language, "eng");
        assert!(cfg.ingest.ocr_pages_bulk < cfg.ingest.ocr_pages_single);
    }

    #[test]
    fn overrides_apply() {
        let cfg: ServerAppConfig = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:9000"
            data_dir = "/tmp/l"

            [ingest]
            max_file_mb = 10
            ocr_if_needed = false
            workers = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.ingest.max_file_mb, 10);
        assert_eq!(cfg.ingest.max_file_bytes(), 10 * 1024 * 1024);
        assert!(!cfg.ingest.ocr_if_needed);
        assert_eq!(cfg.ingest.workers, 2);
    }
}
