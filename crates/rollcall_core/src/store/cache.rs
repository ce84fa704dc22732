//! Local cache collaborator.
//!
//! # Responsibility
//! - Persist the document synchronously after every mutation.
//! - Never surface I/O errors to callers; log and degrade instead.
//!
//! # Invariants
//! - `load` returns `None` for a missing or unreadable cache.
//! - `save` is best-effort; a failed write leaves the previous file intact.

use crate::model::document::Document;
use log::{info, warn};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Synchronous document cache read on startup and written on every mutation.
pub trait LocalCache: Send + Sync {
    /// Returns the raw cached value, or `None` when nothing usable exists.
    fn load(&self) -> Option<Value>;
    /// Writes the document. Internal errors are logged, never raised.
    fn save(&self, document: &Document);
}

/// File-backed cache holding the whole document as one JSON file.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalCache for FileCache {
    fn load(&self) -> Option<Value> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                info!(
                    "event=cache_load module=store status=absent path={} error={err}",
                    self.path.display()
                );
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "event=cache_load module=store status=error path={} error_code=parse_failed error={err}",
                    self.path.display()
                );
                None
            }
        }
    }

    fn save(&self, document: &Document) {
        let bytes = match serde_json::to_vec(document) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("event=cache_save module=store status=error error_code=serialize_failed error={err}");
                return;
            }
        };
        // Write-then-rename keeps the previous cache readable if the process
        // dies mid-write.
        let staging = self.path.with_extension("tmp");
        let result = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, &self.path));
        if let Err(err) = result {
            warn!(
                "event=cache_save module=store status=error path={} error_code=write_failed error={err}",
                self.path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileCache, LocalCache};
    use crate::model::document::Document;

    #[test]
    fn load_from_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let cache = FileCache::new(dir.path().join("missing.json"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let cache = FileCache::new(dir.path().join("rollcall.json"));
        let doc = Document::default_document();

        cache.save(&doc);
        let value = cache.load().expect("saved cache should load");
        assert_eq!(value["version"], 1);
        assert_eq!(value["classes"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn unparseable_cache_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("rollcall.json");
        std::fs::write(&path, b"{not json").expect("fixture write should succeed");
        assert!(FileCache::new(path).load().is_none());
    }
}
