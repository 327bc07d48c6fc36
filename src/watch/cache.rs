// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Last seen content hash per file.
///
/// A single save often produces several notifications (create, modify,
/// metadata). Only the first one with new content is worth a rebuild.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content of `path`.
    ///
    /// Returns `true` when the content differs from the last observation
    /// (or the file was never seen).
    pub fn observe(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<bool> {
        let hash = compute_file_hash(fs, path)?;
        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(previous) if previous == hash => {
                debug!(?path, "content unchanged since last event");
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Forget a file (e.g. after it was removed).
    pub fn invalidate(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated cache for {:?}", path);
        }
    }
}
