//! Durable blob storage for uploaded documents.
//!
//! Files are written under a single content directory with generated names —
//! never the client-supplied name — so concurrent uploads cannot collide and
//! a hostile filename cannot escape the store. The original extension is
//! preserved on the generated name so extension-based kind sniffing keeps
//! working downstream.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::distr::Alphanumeric;
use rand::Rng;

/// Random tail appended after the millisecond timestamp.
const SUFFIX_LEN: usize = 8;

pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let root = dir.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating content dir {}", root.display()))?;
        Ok(Self { root })
    }

    /// Write a payload under a fresh generated name and return its locator.
    ///
    /// The write goes to a `.tmp` sibling first and is renamed into place, so
    /// readers never observe a partial blob.
    pub fn store(&self, bytes: &[u8], original_filename: &str) -> Result<String> {
        let locator = generate_name(original_filename);
        let final_path = self.root.join(&locator);
        let tmp_path = self.root.join(format!("{locator}.tmp"));

        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("publishing {}", final_path.display()))?;

        tracing::debug!(locator = %locator, bytes = bytes.len(), "stored blob");
        Ok(locator)
    }

    /// Open a stored blob for reading, returning the handle and total length.
    ///
    /// `ErrorKind::NotFound` means the locator does not exist — callers map
    /// it separately from malformed-request errors.
    pub fn open(&self, locator: &str) -> io::Result<(fs::File, u64)> {
        let path = self.resolve(locator)?;
        let file = fs::File::open(path)?;
        let len = file.metadata()?.len();
        Ok((file, len))
    }

    /// Remove a stored blob. Exposed for the external document-management
    /// collaborator that owns record deletion.
    pub fn delete(&self, locator: &str) -> io::Result<()> {
        let path = self.resolve(locator)?;
        fs::remove_file(path)
    }

    /// Validate a locator and turn it into an on-disk path. Locators are a
    /// single generated path component; anything else is rejected.
    fn resolve(&self, locator: &str) -> io::Result<PathBuf> {
        if locator.is_empty()
            || locator.contains(['/', '\\'])
            || locator.contains("..")
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid locator: {locator:?}"),
            ));
        }
        Ok(self.root.join(locator))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// `{unix_millis}-{random alphanumeric}` plus the original extension.
fn generate_name(original_filename: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();

    match sanitized_extension(original_filename) {
        Some(ext) => format!("{millis}-{suffix}.{ext}"),
        None => format!("{millis}-{suffix}"),
    }
}

/// Extension of the original name, kept only if it is short and purely
/// alphanumeric — the one part of the client name that survives.
fn sanitized_extension(name: &str) -> Option<String> {
    let idx = name.rfind('.')?;
    if idx == 0 || idx + 1 == name.len() {
        return None;
    }
    let ext = &name[idx + 1..];
    if ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("content")).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let (_dir, store) = store();
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let locator = store.store(&payload, "lecture.pdf").unwrap();
        let (mut file, len) = store.open(&locator).unwrap();
        assert_eq!(len, payload.len() as u64);

        let mut read_back = Vec::new();
        file.read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back, payload);
    }

    #[test]
    fn locator_preserves_extension() {
        let (_dir, store) = store();
        let locator = store.store(b"x", "Week 3 Notes.PDF").unwrap();
        assert!(locator.ends_with(".pdf"), "{locator}");
        assert!(!locator.contains(' '));
    }

    #[test]
    fn locator_drops_suspicious_extension() {
        let (_dir, store) = store();
        let locator = store.store(b"x", "evil.p/../df").unwrap();
        assert!(!locator.contains('/'));
        assert!(!locator.contains(".."));
    }

    #[test]
    fn locators_are_unique() {
        let (_dir, store) = store();
        let a = store.store(b"a", "same.pdf").unwrap();
        let b = store.store(b"b", "same.pdf").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn open_missing_is_not_found() {
        let (_dir, store) = store();
        let err = store.open("1700000000000-missing.pdf").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn traversal_locators_rejected() {
        let (_dir, store) = store();
        for bad in ["../etc/passwd", "a/b.pdf", "a\\b.pdf", "", "..", "x..y"] {
            let err = store.open(bad).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "locator {bad:?}");
        }
    }

    #[test]
    fn delete_removes_blob() {
        let (_dir, store) = store();
        let locator = store.store(b"bytes", "gone.pdf").unwrap();
        store.delete(&locator).unwrap();
        let err = store.open(&locator).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let (_dir, store) = store();
        let locator = store.store(b"bytes", "a.pdf").unwrap();
        let entries: Vec<_> = fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec![locator]);
    }
}
