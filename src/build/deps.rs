// src/build/deps.rs

//! Module dependency graph builder.
//!
//! Scans the processed scripts tree, reads each module's header, resolves the
//! transitive dependency closure of every module and persists the result as
//! `dependencies.json` under the metadata directory:
//!
//! ```json
//! {
//!   "modules": {
//!     "li.badge": {
//!       "file": "components/badge/badge.js",
//!       "dependencies": ["li.users"],
//!       "order": ["li.dates", "li.users"]
//!     }
//!   }
//! }
//! ```
//!
//! `order` lists the full closure in load order (dependencies before their
//! dependents). Every rebuild rescans the whole tree, so its cost is
//! proportional to the total number of modules even when only one file
//! changed.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::build::header::ModuleHeader;
use crate::build::template::module_name_for;
use crate::build::{write_output_atomic, OutputFile};
use crate::errors::{Result, SdkError};
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, PatternSet};

/// File name of the aggregate metadata artifact.
pub const METADATA_FILE: &str = "dependencies.json";

/// One module found in the scripts tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    pub name: String,
    /// Path relative to the scripts directory, `/`-separated.
    pub file: String,
    pub header: ModuleHeader,
}

/// Resolved record of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    pub file: String,
    pub dependencies: Vec<String>,
    pub order: Vec<String>,
}

impl ModuleRecord {
    /// Every module reachable from this one, itself excluded.
    pub fn closure(&self) -> BTreeSet<String> {
        self.order.iter().cloned().collect()
    }
}

/// Resolved dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    pub modules: BTreeMap<String, ModuleRecord>,
}

impl DependencyGraph {
    pub fn get(&self, module: &str) -> Option<&ModuleRecord> {
        self.modules.get(module)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct DependencyRequest<'a> {
    pub scripts_dir: &'a Path,
    pub metadata_dir: &'a Path,
    /// Names that may stay unresolved; they are kept as leaves.
    pub externals: &'a [String],
    /// Files that triggered this rebuild. Only logged; the tree is always
    /// rescanned in full.
    pub incremental_hint: Option<&'a [PathBuf]>,
}

/// Scan, resolve and persist the dependency graph.
///
/// Nothing is written unless every module resolves.
pub fn create_dependencies(
    fs: &dyn FileSystem,
    req: &DependencyRequest<'_>,
) -> Result<(DependencyGraph, OutputFile)> {
    if let Some(hint) = req.incremental_hint {
        debug!(
            changed = hint.len(),
            "dependency rebuild triggered by change; rescanning every module"
        );
    }

    let sources = scan_modules(fs, req.scripts_dir, req.metadata_dir)?;
    let graph = resolve_graph(&sources, req.externals)?;

    let out_path = req.metadata_dir.join(METADATA_FILE);
    let written = write_output_atomic(fs, &out_path, graph.to_json()?.as_bytes())?;
    info!(modules = graph.modules.len(), file = ?out_path, "dependency metadata ready");
    Ok((graph, written))
}

/// Every module under `scripts_dir`, in path order.
///
/// Files under `metadata_dir` are skipped. A module is named by its
/// `@module` header tag, or by its relative path when the tag is absent.
pub fn scan_modules(
    fs: &dyn FileSystem,
    scripts_dir: &Path,
    metadata_dir: &Path,
) -> Result<Vec<ModuleSource>> {
    let set = PatternSet::new(["**/*.js"])?;
    let mut files = collect_matching_files(fs, scripts_dir, &set)?;
    files.retain(|f| !f.starts_with(metadata_dir));

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut out = Vec::with_capacity(files.len());
    for path in files {
        let rel = relative_str(scripts_dir, &path).unwrap_or_else(|| path.display().to_string());
        let header = ModuleHeader::parse(&fs.read_to_string(&path)?);
        let name = header
            .module
            .clone()
            .unwrap_or_else(|| module_name_for(&rel));

        if let Some(first) = seen.insert(name.clone(), path.clone()) {
            return Err(SdkError::DuplicateModule {
                module: name,
                first,
                second: path,
            });
        }
        out.push(ModuleSource {
            name,
            file: rel,
            header,
        });
    }
    Ok(out)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Resolve direct dependencies into closures.
///
/// Depth-first with memoization: each module is expanded once. A module met
/// again while still being expanded is a cycle.
pub fn resolve_graph(sources: &[ModuleSource], externals: &[String]) -> Result<DependencyGraph> {
    let by_name: HashMap<&str, &ModuleSource> =
        sources.iter().map(|s| (s.name.as_str(), s)).collect();
    let externals: HashSet<&str> = externals
        .iter()
        .map(String::as_str)
        .chain(
            sources
                .iter()
                .flat_map(|s| s.header.externals.iter().map(String::as_str)),
        )
        .collect();

    let mut resolver = Resolver {
        by_name: &by_name,
        externals: &externals,
        state: HashMap::new(),
        orders: HashMap::new(),
        stack: Vec::new(),
    };

    let mut graph = DependencyGraph::default();
    for source in sources {
        resolver.visit(&source.name)?;
        graph.modules.insert(
            source.name.clone(),
            ModuleRecord {
                file: source.file.clone(),
                dependencies: source.header.requires.clone(),
                order: resolver.orders[source.name.as_str()].clone(),
            },
        );
    }
    Ok(graph)
}

struct Resolver<'a> {
    by_name: &'a HashMap<&'a str, &'a ModuleSource>,
    externals: &'a HashSet<&'a str>,
    state: HashMap<String, Visit>,
    orders: HashMap<String, Vec<String>>,
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, name: &str) -> Result<()> {
        match self.state.get(name) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
                let mut path: Vec<&str> = self.stack[start..].iter().map(String::as_str).collect();
                path.push(name);
                return Err(SdkError::ModuleCycle {
                    module: name.to_string(),
                    path: path.join(" -> "),
                });
            }
            None => {}
        }

        let by_name: &'a HashMap<&'a str, &'a ModuleSource> = self.by_name;
        let source: &'a ModuleSource = by_name[name];
        self.state.insert(name.to_string(), Visit::InProgress);
        self.stack.push(name.to_string());

        let mut order: Vec<String> = Vec::new();
        for dep in &source.header.requires {
            if self.by_name.contains_key(dep.as_str()) {
                self.visit(dep)?;
                for transitive in &self.orders[dep.as_str()] {
                    if !order.contains(transitive) {
                        order.push(transitive.clone());
                    }
                }
            } else if !self.externals.contains(dep.as_str()) {
                return Err(SdkError::UnresolvedDependency {
                    module: name.to_string(),
                    dependency: dep.clone(),
                });
            }
            if !order.contains(dep) {
                order.push(dep.clone());
            }
        }

        self.stack.pop();
        self.state.insert(name.to_string(), Visit::Done);
        self.orders.insert(name.to_string(), order);
        Ok(())
    }
}
