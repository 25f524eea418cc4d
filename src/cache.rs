//! Time-boxed on-disk cache for API collection snapshots.
//!
//! An entry is valid while `now - mtime < CACHE_EXPIRY`. Expired,
//! missing, or unparseable entries are a cache miss, never an error; a
//! corrupt file is deleted so it cannot shadow the next write. Files
//! are read and written without locking, which is acceptable for a
//! single-operator tool.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Fixed validity window for cached collections.
pub const CACHE_EXPIRY: Duration = Duration::from_secs(3600);

/// The collections this tool caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Documents,
    Templates,
}

impl CacheKind {
    fn file_name(self) -> &'static str {
        match self {
            CacheKind::Documents => "cached_documents.json",
            CacheKind::Templates => "cached_templates.json",
        }
    }
}

/// Disk cache rooted at one directory.
#[derive(Clone)]
pub struct CollectionCache {
    dir: PathBuf,
}

impl CollectionCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, kind: CacheKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Load a collection if present and not expired.
    pub fn load<T: DeserializeOwned>(&self, kind: CacheKind) -> Option<Vec<T>> {
        let path = self.path(kind);
        if !is_fresh(&path) {
            return None;
        }

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cache unreadable, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(items) => {
                debug!(path = %path.display(), "cache hit");
                Some(items)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache file, deleting");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    /// Overwrite the entry with a fresh payload. Failures are logged,
    /// not propagated; the cache is an optimization, never a dependency.
    pub fn store<T: Serialize>(&self, kind: CacheKind, items: &[T]) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "could not create cache dir");
            return;
        }
        let path = self.path(kind);
        match serde_json::to_string(items) {
            Ok(body) => {
                if let Err(e) = std::fs::write(&path, body) {
                    warn!(path = %path.display(), error = %e, "could not write cache");
                } else {
                    debug!(path = %path.display(), count = items.len(), "cache updated");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize cache payload"),
        }
    }

    /// Drop an entry so the next fetch hits the API.
    pub fn invalidate(&self, kind: CacheKind) {
        let path = self.path(kind);
        if path.exists() {
            let _ = std::fs::remove_file(&path);
            debug!(path = %path.display(), "cache invalidated");
        }
    }
}

fn is_fresh(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(mtime) = metadata.modified() else {
        return false;
    };
    match SystemTime::now().duration_since(mtime) {
        Ok(age) => age < CACHE_EXPIRY,
        // mtime in the future: clock skew, treat as fresh
        Err(_) => true,
    }
}
