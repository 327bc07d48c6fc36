// src/watch/patterns.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;

/// An ordered list of inclusion and `!`-negated exclusion globs.
///
/// Matching follows the usual file-glob convention: every pattern is tested in
/// order and the *last* one that matches decides. A later `!pattern` removes
/// paths an earlier pattern included, and a later plain pattern can re-include
/// something an earlier negation removed. A path no pattern matches is
/// excluded.
///
/// Patterns are relative to a project root and always use `/` separators.
/// `*` does not cross directory boundaries; `**` does.
#[derive(Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    negated: Vec<bool>,
    set: GlobSet,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    /// Compile an ordered pattern list.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut raw = Vec::new();
        let mut negated = Vec::new();

        for pat in patterns {
            let pat = pat.as_ref().trim();
            let (neg, body) = match pat.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, pat),
            };
            let glob = GlobBuilder::new(body)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern: {pat}"))?;
            builder.add(glob);
            raw.push(pat.to_string());
            negated.push(neg);
        }

        Ok(Self {
            patterns: raw,
            negated,
            set: builder.build().context("building glob set")?,
        })
    }

    /// The patterns in declaration order, negations keep their `!`.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `rel_path` (relative, `/`-separated) is selected by this set.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.deciding_index(rel_path)
            .map(|idx| !self.negated[idx])
            .unwrap_or(false)
    }

    /// The pattern that selected `rel_path`, if it is selected at all.
    pub fn matching_pattern(&self, rel_path: &str) -> Option<&str> {
        let idx = self.deciding_index(rel_path)?;
        if self.negated[idx] {
            None
        } else {
            Some(self.patterns[idx].as_str())
        }
    }

    fn deciding_index(&self, rel_path: &str) -> Option<usize> {
        self.set.matches(rel_path).into_iter().max()
    }

    /// Literal directory prefixes of the inclusion patterns, in pattern order.
    ///
    /// `src/**/*.js` yields `src`, `res/**` yields `res`, and a pattern that
    /// starts with a wildcard yields the empty path (the root itself).
    pub fn walk_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::new();
        for (pat, neg) in self.patterns.iter().zip(&self.negated) {
            if *neg {
                continue;
            }
            let mut prefix = PathBuf::new();
            let components: Vec<&str> = pat.split('/').collect();
            // The last component is a file name (or glob); never walk into it.
            for comp in &components[..components.len().saturating_sub(1)] {
                if comp.contains(['*', '?', '[', '{']) {
                    break;
                }
                prefix.push(comp);
            }
            if !roots.contains(&prefix) {
                roots.push(prefix);
            }
        }
        roots
    }
}

/// Collect every file under `root` selected by `set`.
///
/// Files come back in resolution order: grouped by the inclusion pattern
/// whose literal prefix led to them (in pattern order), sorted by path within
/// a group, each file at most once.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    set: &PatternSet,
) -> Result<Vec<PathBuf>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();

    for walk_root in set.walk_roots() {
        let start = if walk_root.as_os_str().is_empty() {
            root.to_path_buf()
        } else {
            root.join(&walk_root)
        };
        if !fs.is_dir(&start) {
            continue;
        }

        let mut group = Vec::new();
        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(root) {
                        let rel_str = rel.to_string_lossy().replace('\\', "/");
                        if set.matches(&rel_str) {
                            group.push(path);
                        }
                    }
                }
            }
        }

        group.sort();
        for path in group {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }

    Ok(out)
}
