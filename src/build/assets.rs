// src/build/assets.rs

//! Static copies: resource/web trees, vendor scripts and merged text files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::build::{write_output, OutputFile};
use crate::errors::{Result, SdkError};
use crate::fs::FileSystem;
use crate::types::BuildMode;
use crate::watch::path_utils::{absolutize, relative_str};
use crate::watch::patterns::{collect_matching_files, PatternSet};

/// Directory under the scripts output receiving vendor scripts.
pub const VENDOR_DIR: &str = "vendor";

/// Patterns for a static tree such as `res` or `web`.
pub fn static_tree_patterns(dir: &str) -> Vec<String> {
    vec![
        format!("{dir}/**"),
        format!("!{dir}/**/README.md"),
        format!("!{dir}/**/*.example"),
    ]
}

/// Copy files selected by `set` from `root` into `dest`, keeping their path
/// relative to `root`.
pub fn copy_tree(
    fs: &dyn FileSystem,
    root: &Path,
    set: &PatternSet,
    dest: &Path,
    mode: &BuildMode,
) -> Result<Vec<OutputFile>> {
    let files = match mode {
        BuildMode::Full => collect_matching_files(fs, root, set)?,
        BuildMode::Incremental(changed) => changed
            .iter()
            .map(|p| absolutize(root, p))
            .filter(|p| {
                fs.is_file(p)
                    && relative_str(root, p).is_some_and(|rel| set.matches(&rel))
            })
            .collect(),
    };

    let mut outputs = Vec::with_capacity(files.len());
    for file in files {
        let Some(rel) = relative_str(root, &file) else {
            continue;
        };
        let bytes = fs.read(&file)?;
        outputs.push(write_output(fs, &dest.join(rel), &bytes)?);
    }
    debug!(dest = ?dest, count = outputs.len(), "tree copied");
    Ok(outputs)
}

/// Copy third-party scripts into `<scripts_dir>/vendor/`.
pub fn copy_vendor_scripts(
    fs: &dyn FileSystem,
    root: &Path,
    files: &[String],
    scripts_dir: &Path,
) -> Result<Vec<OutputFile>> {
    let mut outputs = Vec::with_capacity(files.len());
    for file in files {
        let src = absolutize(root, Path::new(file));
        if !fs.is_file(&src) {
            return Err(SdkError::Config(format!(
                "Module dependency {file} not found at {}",
                src.display()
            )));
        }
        let Some(name) = src.file_name() else {
            continue;
        };
        let bytes = fs.read(&src)?;
        outputs.push(write_output(fs, &scripts_dir.join(VENDOR_DIR).join(name), &bytes)?);
    }
    Ok(outputs)
}

/// Merge `.properties` files with the same name across `dirs`.
///
/// Later directories override keys of earlier ones. Each merged file is
/// written to `text_dir` with its keys sorted.
pub fn merge_text_properties(
    fs: &dyn FileSystem,
    root: &Path,
    dirs: &[PathBuf],
    text_dir: &Path,
) -> Result<Vec<OutputFile>> {
    let mut merged: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for dir in dirs {
        let dir = absolutize(root, dir);
        if !fs.is_dir(&dir) {
            debug!(dir = ?dir, "text directory missing; skipping");
            continue;
        }
        let mut entries = fs.read_dir(&dir)?;
        entries.sort();
        for path in entries {
            let is_properties = path.extension().is_some_and(|e| e == "properties");
            if !fs.is_file(&path) || !is_properties {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let entries = parse_properties(&fs.read_to_string(&path)?);
            merged.entry(name).or_default().extend(entries);
        }
    }

    let mut outputs = Vec::with_capacity(merged.len());
    for (name, entries) in &merged {
        let mut text = String::new();
        for (key, value) in entries {
            text.push_str(&format!("{key} = {value}\n"));
        }
        outputs.push(write_output(fs, &text_dir.join(name), text.as_bytes())?);
    }
    info!(files = outputs.len(), "text properties merged");
    Ok(outputs)
}

/// Parse `key = value` lines. `#`/`!` lines are comments, a trailing
/// backslash continues the value on the next line.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = String::from(trimmed);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = match logical.find(['=', ':']) {
            Some(idx) => (&logical[..idx], &logical[idx + 1..]),
            None => (logical.as_str(), ""),
        };
        let key = key.trim();
        if !key.is_empty() {
            out.insert(key.to_string(), value.trim().to_string());
        }
    }
    out
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn static_tree_skips_readmes_and_examples() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/res/img/a.png", "png");
        fs.add_file("/p/res/README.md", "docs");
        fs.add_file("/p/res/conf.json.example", "{}");

        let set = PatternSet::new(static_tree_patterns("res")).unwrap();
        let outputs = copy_tree(&fs, Path::new("/p"), &set, Path::new("/p/plugin"), &BuildMode::Full)
            .unwrap();

        assert_eq!(outputs, vec![OutputFile::changed("/p/plugin/res/img/a.png")]);
    }

    #[test]
    fn incremental_copy_takes_only_changed_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/web/a.css", "a");
        fs.add_file("/p/web/b.css", "b");

        let set = PatternSet::new(static_tree_patterns("web")).unwrap();
        let mode = BuildMode::Incremental(vec![PathBuf::from("web/b.css")]);
        let outputs = copy_tree(&fs, Path::new("/p"), &set, Path::new("/p/plugin"), &mode).unwrap();

        assert_eq!(outputs, vec![OutputFile::changed("/p/plugin/web/b.css")]);
    }

    #[test]
    fn vendor_scripts_land_in_vendor_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/node_modules/lib/dist/lib.min.js", "lib");

        let outputs = copy_vendor_scripts(
            &fs,
            Path::new("/p"),
            &["node_modules/lib/dist/lib.min.js".to_string()],
            Path::new("/p/out"),
        )
        .unwrap();
        assert_eq!(outputs[0].path, PathBuf::from("/p/out/vendor/lib.min.js"));

        let err = copy_vendor_scripts(&fs, Path::new("/p"), &["nope.js".to_string()], Path::new("/p/out"))
            .unwrap_err();
        assert!(err.to_string().contains("nope.js"));
    }

    #[test]
    fn later_text_dirs_override_earlier_ones() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/base/text.en.properties", "greeting = Hello\nfarewell = Bye\n");
        fs.add_file("/p/over/text.en.properties", "# override\ngreeting = Hi\n");

        let outputs = merge_text_properties(
            &fs,
            Path::new("/p"),
            &[PathBuf::from("base"), PathBuf::from("over")],
            Path::new("/p/plugin/text"),
        )
        .unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(
            fs.read_to_string(Path::new("/p/plugin/text/text.en.properties")).unwrap(),
            "farewell = Bye\ngreeting = Hi\n"
        );
    }

    #[test]
    fn properties_continuation_lines_join() {
        let parsed = parse_properties("long = first \\\n    second\nplain: v\n! bang comment\n");
        assert_eq!(parsed["long"], "first second");
        assert_eq!(parsed["plain"], "v");
        assert_eq!(parsed.len(), 2);
    }
}
