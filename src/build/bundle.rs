// src/build/bundle.rs

//! Single-entry-point bundles.
//!
//! Starting from the entry file, every relative `require('./x')` is resolved
//! (`x`, `x.js`, `x/index.js`) until the closure is complete. The sources are
//! then wrapped into one artifact with a small module loader prelude. Module
//! ids follow discovery order, the entry being `0`.
//!
//! The artifact (and its map) are replaced atomically, so a failed bundle
//! never leaves a half-written file behind.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::build::sourcemap::{count_lines, index_map, map_reference, MappedSource};
use crate::build::{write_output_atomic, OutputFile};
use crate::errors::{Result, SdkError};
use crate::fs::FileSystem;
use crate::watch::path_utils::{relative_str, to_slash};

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid require regex")
});

const PRELUDE: &str = "(function (modules) {
  var cache = {};
  function load(id) {
    if (cache[id]) {
      return cache[id].exports;
    }
    var module = cache[id] = { exports: {} };
    var entry = modules[id];
    entry[0].call(module.exports, function (name) {
      return load(entry[1][name]);
    }, module, module.exports);
    return module.exports;
  }
  load(0);
})({
";

#[derive(Debug, Clone)]
pub struct BundleRequest<'a> {
    /// Project root, used to name sources in the map.
    pub root: &'a Path,
    pub entry: &'a Path,
    pub output_dir: &'a Path,
    pub output_name: &'a str,
    pub source_maps: bool,
}

#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub outputs: Vec<OutputFile>,
    /// Transitive source set of the entry, entry included.
    pub sources: BTreeSet<PathBuf>,
}

/// One resolved module of the bundle.
#[derive(Debug, Clone)]
pub struct BundleModule {
    pub path: PathBuf,
    pub source: String,
    /// Specifier -> module id.
    pub imports: BTreeMap<String, usize>,
}

/// Resolve the entry's closure in discovery order.
pub fn resolve_bundle(fs: &dyn FileSystem, entry: &Path) -> Result<Vec<BundleModule>> {
    if !fs.is_file(entry) {
        return Err(SdkError::BundleEntryMissing(entry.to_path_buf()));
    }

    let mut ids: HashMap<PathBuf, usize> = HashMap::new();
    let mut modules: Vec<BundleModule> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    ids.insert(entry.to_path_buf(), 0);
    modules.push(BundleModule {
        path: entry.to_path_buf(),
        source: fs.read_to_string(entry)?,
        imports: BTreeMap::new(),
    });
    queue.push_back(0);

    while let Some(id) = queue.pop_front() {
        let from = modules[id].path.clone();
        let specifiers: Vec<String> = REQUIRE_RE
            .captures_iter(&modules[id].source)
            .map(|c| c[1].to_string())
            .collect();

        for spec in specifiers {
            let target = resolve_specifier(fs, &from, &spec)?;
            let target_id = match ids.get(&target) {
                Some(existing) => *existing,
                None => {
                    let next = modules.len();
                    debug!(module = ?target, id = next, "bundle module discovered");
                    modules.push(BundleModule {
                        source: fs.read_to_string(&target)?,
                        path: target.clone(),
                        imports: BTreeMap::new(),
                    });
                    ids.insert(target, next);
                    queue.push_back(next);
                    next
                }
            };
            modules[id].imports.insert(spec, target_id);
        }
    }

    Ok(modules)
}

fn resolve_specifier(fs: &dyn FileSystem, from: &Path, spec: &str) -> Result<PathBuf> {
    let unresolved = || SdkError::UnresolvedImport {
        specifier: spec.to_string(),
        from: from.to_path_buf(),
    };

    if !(spec.starts_with("./") || spec.starts_with("../")) {
        return Err(unresolved());
    }

    let base = normalize(&from.parent().unwrap_or(Path::new("")).join(spec));
    let candidates = [
        base.clone(),
        PathBuf::from(format!("{}.js", base.display())),
        base.join("index.js"),
    ];
    candidates
        .into_iter()
        .find(|c| fs.is_file(c))
        .ok_or_else(unresolved)
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Build the bundle and replace the artifact.
pub fn process_bundle(fs: &dyn FileSystem, req: &BundleRequest<'_>) -> Result<BundleOutput> {
    let modules = resolve_bundle(fs, req.entry)?;

    let mut body = String::from(PRELUDE);
    let mut mapped = Vec::with_capacity(modules.len());
    for (id, module) in modules.iter().enumerate() {
        body.push_str(&format!("{id}: [function (require, module, exports) {{\n"));
        mapped.push(MappedSource {
            source: relative_str(req.root, &module.path).unwrap_or_else(|| to_slash(&module.path)),
            line: body.matches('\n').count(),
            line_count: count_lines(&module.source),
        });
        body.push_str(&module.source);
        if !module.source.ends_with('\n') {
            body.push('\n');
        }
        let imports = serde_json::to_string(&module.imports)?;
        let sep = if id + 1 < modules.len() { "," } else { "" };
        body.push_str(&format!("}}, {imports}]{sep}\n"));
    }
    body.push_str("});\n");

    let artifact = req.output_dir.join(req.output_name);
    let mut outputs = Vec::new();
    if req.source_maps {
        let map_name = format!("{}.map", req.output_name);
        let map = index_map(req.output_name, &mapped)?;
        body.push_str(&map_reference(&map_name));
        outputs.push(write_output_atomic(fs, &artifact, body.as_bytes())?);
        outputs.push(write_output_atomic(
            fs,
            &req.output_dir.join(map_name),
            map.as_bytes(),
        )?);
    } else {
        outputs.push(write_output_atomic(fs, &artifact, body.as_bytes())?);
    }

    info!(
        entry = ?req.entry,
        modules = modules.len(),
        file = ?artifact,
        "bundle written"
    );

    Ok(BundleOutput {
        outputs,
        sources: modules.into_iter().map(|m| m.path).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn request<'a>(entry: &'a Path, maps: bool) -> BundleRequest<'a> {
        BundleRequest {
            root: Path::new("/p"),
            entry,
            output_dir: Path::new("/p/dist"),
            output_name: "widget.js",
            source_maps: maps,
        }
    }

    fn widget() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/p/src/main.js",
            "var util = require('./lib/util');\nvar view = require('./view');\nutil.go(view);\n",
        );
        fs.add_file("/p/src/lib/util.js", "var h = require('../helpers');\nexports.go = h.go;\n");
        fs.add_file("/p/src/helpers/index.js", "exports.go = function () {};\n");
        fs.add_file("/p/src/view.js", "module.exports = {};\n");
        fs
    }

    #[test]
    fn resolves_closure_in_discovery_order() {
        let fs = widget();
        let modules = resolve_bundle(&fs, Path::new("/p/src/main.js")).unwrap();

        let paths: Vec<_> = modules.iter().map(|m| m.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/p/src/main.js"),
                PathBuf::from("/p/src/lib/util.js"),
                PathBuf::from("/p/src/view.js"),
                PathBuf::from("/p/src/helpers/index.js"),
            ]
        );
        assert_eq!(modules[1].imports.get("../helpers"), Some(&3));
    }

    #[test]
    fn writes_artifact_and_index_map() {
        let fs = widget();
        let entry = PathBuf::from("/p/src/main.js");
        let out = process_bundle(&fs, &request(&entry, true)).unwrap();

        assert_eq!(out.sources.len(), 4);
        assert_eq!(out.outputs.len(), 2);
        let js = fs.read_to_string(Path::new("/p/dist/widget.js")).unwrap();
        assert!(js.contains("0: [function (require, module, exports) {\nvar util"));
        assert!(js.ends_with("//# sourceMappingURL=widget.js.map\n"));

        let map: serde_json::Value =
            serde_json::from_str(&fs.read_to_string(Path::new("/p/dist/widget.js.map")).unwrap())
                .unwrap();
        assert_eq!(map["sections"][0]["map"]["sources"][0], "src/main.js");
    }

    #[test]
    fn missing_entry_is_fatal() {
        let fs = MockFileSystem::new();
        let entry = PathBuf::from("/p/src/nope.js");
        let err = process_bundle(&fs, &request(&entry, false)).unwrap_err();
        assert!(matches!(err, SdkError::BundleEntryMissing(_)));
    }

    #[test]
    fn unresolved_import_leaves_previous_artifact_untouched() {
        let fs = widget();
        let entry = PathBuf::from("/p/src/main.js");
        process_bundle(&fs, &request(&entry, false)).unwrap();
        let before = fs.read_to_string(Path::new("/p/dist/widget.js")).unwrap();
        fs.take_writes();

        fs.add_file("/p/src/view.js", "require('./missing');\n");
        let err = process_bundle(&fs, &request(&entry, false)).unwrap_err();

        assert!(matches!(err, SdkError::UnresolvedImport { ref specifier, .. } if specifier == "./missing"));
        assert!(fs.take_writes().is_empty());
        assert_eq!(fs.read_to_string(Path::new("/p/dist/widget.js")).unwrap(), before);
    }

    #[test]
    fn bare_specifiers_are_not_resolved() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/main.js", "require('angular');\n");
        let err = resolve_bundle(&fs, Path::new("/p/src/main.js")).unwrap_err();
        assert!(matches!(err, SdkError::UnresolvedImport { .. }));
    }
}
