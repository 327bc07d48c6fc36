// src/watch/hash.rs

use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hash of an in-memory buffer.
pub fn compute_bytes_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {:?}", path))?;
    Ok(compute_bytes_hash(&bytes))
}

/// Compute a deterministic hash over the contents of the given files.
///
/// Order of `paths` does not matter; they are sorted before hashing. Each
/// file's relative name is mixed in so a rename changes the digest.
pub fn compute_tree_hash(fs: &dyn FileSystem, root: &Path, paths: &[impl AsRef<Path>]) -> Result<String> {
    let mut sorted: Vec<&Path> = paths.iter().map(|p| p.as_ref()).collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    for path in sorted {
        if !fs.is_file(path) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(compute_file_hash(fs, path)?.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, "computed tree hash");
    Ok(hash)
}

/// Whether writing `contents` to `path` would change what is on disk.
pub fn differs_from_disk(fs: &dyn FileSystem, path: &Path, contents: &[u8]) -> bool {
    if !fs.is_file(path) {
        return true;
    }
    match compute_file_hash(fs, path) {
        Ok(existing) => existing != compute_bytes_hash(contents),
        Err(_) => true,
    }
}
