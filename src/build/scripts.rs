// src/build/scripts.rs

//! Script/template processor.
//!
//! Resolves a pattern set to a working set of sources, transforms each one
//! and writes it below the output directory, keeping its path relative to
//! the source root. Templates are compiled into template-cache modules;
//! scripts are structurally checked and carried over unchanged.
//!
//! The same inputs always produce byte-identical outputs at the same paths,
//! so a repeated or incremental run overwrites rather than duplicates.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::build::sourcemap::{count_lines, identity_map, map_reference};
use crate::build::syntax::check_script;
use crate::build::template::{compile_template, is_template, output_rel_path};
use crate::build::{write_output, OutputFile};
use crate::errors::{Result, SdkError};
use crate::fs::FileSystem;
use crate::types::BuildMode;
use crate::watch::path_utils::{absolutize, relative_str, to_slash};
use crate::watch::patterns::{collect_matching_files, PatternSet};

/// Default source patterns of the script pipeline.
pub fn default_script_patterns(source_root: &Path) -> Vec<String> {
    let root = to_slash(source_root);
    vec![
        format!("{root}/**/*.js"),
        format!("{root}/**/*.tpl.html"),
        format!("!{root}/**/*.spec.js"),
    ]
}

/// One invocation of the processor.
#[derive(Debug, Clone)]
pub struct ProcessRequest<'a> {
    /// Project root; patterns and changed files are relative to it.
    pub root: &'a Path,
    pub patterns: &'a PatternSet,
    /// Prefix (relative to `root`) stripped from source paths in the output.
    pub source_root: &'a Path,
    pub output_dir: &'a Path,
    pub mode: &'a BuildMode,
    pub source_maps: bool,
}

impl ProcessRequest<'_> {
    /// Path of the output derived from `source`.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let rel = self.rel_to_source_root(source);
        if is_template(&rel) {
            self.output_dir.join(output_rel_path(&rel))
        } else {
            self.output_dir.join(rel)
        }
    }

    fn rel_to_source_root(&self, source: &Path) -> String {
        let base = self.root.join(self.source_root);
        relative_str(&base, source)
            .or_else(|| relative_str(self.root, source))
            .unwrap_or_else(|| to_slash(source))
    }
}

/// Run the processor.
///
/// Files are handled in resolution order. The first file that fails to
/// compile stops the run; its output is not written, while outputs of files
/// handled before it stay on disk.
pub fn process(fs: &dyn FileSystem, req: &ProcessRequest<'_>) -> Result<Vec<OutputFile>> {
    let files = resolve_working_set(fs, req)?;
    debug!(
        count = files.len(),
        incremental = req.mode.is_incremental(),
        "processing scripts"
    );

    let mut outputs = Vec::new();
    for file in &files {
        outputs.extend(process_file(fs, req, file)?);
    }

    let changed = outputs.iter().filter(|o| o.changed).count();
    info!(files = files.len(), changed, "scripts processed");
    Ok(outputs)
}

fn resolve_working_set(fs: &dyn FileSystem, req: &ProcessRequest<'_>) -> Result<Vec<PathBuf>> {
    match req.mode {
        BuildMode::Full => Ok(collect_matching_files(fs, req.root, req.patterns)?),
        BuildMode::Incremental(changed) => {
            let mut seen = HashSet::new();
            let mut files = Vec::new();
            for path in changed {
                let abs = absolutize(req.root, path);
                let Some(rel) = relative_str(req.root, &abs) else {
                    debug!(file = ?abs, "changed file outside project root; ignoring");
                    continue;
                };
                if !req.patterns.matches(&rel) {
                    debug!(file = %rel, "changed file not selected by patterns");
                    continue;
                }
                if !fs.is_file(&abs) {
                    debug!(file = %rel, "changed file no longer exists; skipping");
                    continue;
                }
                if seen.insert(abs.clone()) {
                    files.push(abs);
                }
            }
            Ok(files)
        }
    }
}

fn process_file(
    fs: &dyn FileSystem,
    req: &ProcessRequest<'_>,
    file: &Path,
) -> Result<Vec<OutputFile>> {
    let source = fs.read_to_string(file)?;
    let rel = req.rel_to_source_root(file);
    let out_path = req.output_path_for(file);

    if is_template(&rel) {
        let compiled = compile_template(&rel, &source).map_err(|e| {
            warn!(file = ?file, line = e.line, "template failed to compile");
            SdkError::TemplateCompile {
                file: file.to_path_buf(),
                line: e.line,
                message: e.message,
            }
        })?;
        return Ok(vec![write_output(fs, &out_path, compiled.as_bytes())?]);
    }

    if rel.ends_with(".js") {
        check_script(&source).map_err(|issue| {
            warn!(file = ?file, line = issue.line, "script failed syntax check");
            SdkError::ScriptSyntax {
                file: file.to_path_buf(),
                line: issue.line,
                message: issue.message,
            }
        })?;

        if req.source_maps {
            return write_with_map(fs, req, file, &out_path, &source);
        }
    }

    Ok(vec![write_output(fs, &out_path, source.as_bytes())?])
}

fn write_with_map(
    fs: &dyn FileSystem,
    req: &ProcessRequest<'_>,
    file: &Path,
    out_path: &Path,
    source: &str,
) -> Result<Vec<OutputFile>> {
    let out_name = out_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let map_name = format!("{out_name}.map");
    let source_ref = relative_str(req.root, file).unwrap_or_else(|| to_slash(file));

    let mut body = source.to_string();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body.push_str(&map_reference(&map_name));

    let map = identity_map(&out_name, &source_ref, count_lines(source))?;

    Ok(vec![
        write_output(fs, out_path, body.as_bytes())?,
        write_output(fs, &out_path.with_file_name(map_name), map.as_bytes())?,
    ])
}
