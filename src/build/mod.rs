// src/build/mod.rs

//! Plugin build stages.
//!
//! - [`scripts`] processes scripts and templates into the scripts output tree
//!   (full or incremental).
//! - [`template`] compiles HTML templates into template-cache modules.
//! - [`syntax`] is the lightweight structural check applied to scripts.
//! - [`header`] parses the dependency header at the top of every module.
//! - [`deps`] builds and persists the module dependency graph.
//! - [`bundle`] produces single-entry-point bundles.
//! - [`sourcemap`] renders v3 source maps for scripts and bundles.
//! - [`assets`] copies static trees, vendor scripts and merges text files.

pub mod assets;
pub mod bundle;
pub mod deps;
pub mod header;
pub mod scripts;
pub mod sourcemap;
pub mod syntax;
pub mod template;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::trace;

use crate::fs::FileSystem;
use crate::watch::hash::differs_from_disk;

/// One file a build stage is responsible for.
///
/// `changed` is false when the stage produced exactly the bytes already on
/// disk; such outputs are left untouched and are not re-uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub changed: bool,
}

impl OutputFile {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            changed: true,
        }
    }
}

/// Write `contents` unless the file already holds exactly these bytes.
pub fn write_output(fs: &dyn FileSystem, path: &Path, contents: &[u8]) -> Result<OutputFile> {
    write_output_with(fs, path, contents, false)
}

/// Like [`write_output`] but replaces the file atomically.
pub fn write_output_atomic(
    fs: &dyn FileSystem,
    path: &Path,
    contents: &[u8],
) -> Result<OutputFile> {
    write_output_with(fs, path, contents, true)
}

fn write_output_with(
    fs: &dyn FileSystem,
    path: &Path,
    contents: &[u8],
    atomic: bool,
) -> Result<OutputFile> {
    if !differs_from_disk(fs, path, contents) {
        trace!(?path, "output unchanged; skipping write");
        return Ok(OutputFile {
            path: path.to_path_buf(),
            changed: false,
        });
    }

    if atomic {
        fs.write_atomic(path, contents)?;
    } else {
        fs.write(path, contents)?;
    }
    Ok(OutputFile::changed(path))
}
