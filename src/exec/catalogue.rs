// src/exec/catalogue.rs

//! The fixed plugin task catalogue.
//!
//! ```text
//! clean <- plugin-init <- plugin-scripts ------+
//!                      <- plugin-script-vendor -+- plugin-script-deps -+
//!                      <- plugin-text ----------------------------------+- plugin-ng
//!                      <- plugin-bundles -------------------------------+
//! plugin-ng <- plugin-res, plugin-web <- plugin-build <- plugin-verify <- plugin-ready
//! plugin-ready <- watch-init <- watch-* <- watch-ng, dev
//! version-check
//! ```
//!
//! The script tasks only run when the project manifest has a `[scripts]`
//! section, the bundle task only when at least one bundle is configured.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::build::assets::{
    copy_tree, copy_vendor_scripts, merge_text_properties, static_tree_patterns,
};
use crate::build::bundle::{process_bundle, BundleRequest};
use crate::build::deps::{create_dependencies, DependencyRequest};
use crate::build::scripts::{default_script_patterns, process, ProcessRequest};
use crate::build::OutputFile;
use crate::config::{BundleConfig, ScriptsSection};
use crate::dag::{Condition, TaskSpec, WatchTrigger};
use crate::engine::{BuildContext, Orchestrator};
use crate::errors::{Result, SdkError};
use crate::exec::{BodyFuture, TaskBody};
use crate::server::VersionChecker;
use crate::types::{BuildMode, PluginPoint};
use crate::watch::hash::compute_tree_hash;
use crate::watch::path_utils::to_slash;
use crate::watch::{collect_matching_files, FileChangeEvent, PatternSet};

pub const CLEAN: &str = "clean";
pub const PLUGIN_INIT: &str = "plugin-init";
pub const PLUGIN_SCRIPTS: &str = "plugin-scripts";
pub const PLUGIN_SCRIPT_VENDOR: &str = "plugin-script-vendor";
pub const PLUGIN_SCRIPT_DEPS: &str = "plugin-script-deps";
pub const PLUGIN_TEXT: &str = "plugin-text";
pub const PLUGIN_BUNDLES: &str = "plugin-bundles";
pub const PLUGIN_NG: &str = "plugin-ng";
pub const PLUGIN_RES: &str = "plugin-res";
pub const PLUGIN_WEB: &str = "plugin-web";
pub const PLUGIN_BUILD: &str = "plugin-build";
pub const PLUGIN_VERIFY: &str = "plugin-verify";
pub const PLUGIN_READY: &str = "plugin-ready";
pub const VERSION_CHECK: &str = "version-check";
pub const WATCH_INIT: &str = "watch-init";
pub const WATCH_SCRIPTS: &str = "watch-scripts";
pub const WATCH_SCRIPT_DEPS: &str = "watch-script-deps";
pub const WATCH_SCRIPT_VENDOR: &str = "watch-script-vendor";
pub const WATCH_TEXT: &str = "watch-text";
pub const WATCH_BUNDLES: &str = "watch-bundles";
pub const WATCH_RES: &str = "watch-res";
pub const WATCH_WEB: &str = "watch-web";
pub const WATCH_NG: &str = "watch-ng";
pub const DEV: &str = "dev";

/// Static tree copied verbatim into the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticTree {
    Res,
    Web,
}

impl StaticTree {
    pub fn dir(self) -> &'static str {
        match self {
            StaticTree::Res => "res",
            StaticTree::Web => "web",
        }
    }
}

/// Body of a catalogue task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStep {
    Clean,
    Scripts,
    ScriptVendor,
    /// Rebuild dependency metadata; a change is passed on as the advisory
    /// incremental hint.
    ScriptDeps,
    Text,
    Bundles,
    /// Full copy on a regular run, only the changed file on a watch event.
    StaticTree(StaticTree),
    Verify,
    Ready,
    VersionCheck,
    WatchInit,
    WatchScripts,
    WatchBundles,
}

fn scripts_enabled() -> Condition {
    Condition::new("scripts enabled", |ctx| ctx.project().scripts_enabled())
}

fn bundles_configured() -> Condition {
    Condition::new("scripts enabled with bundles configured", |ctx| {
        ctx.project().scripts_enabled() && !ctx.project().bundles().is_empty()
    })
}

fn scripts_section(ctx: &BuildContext) -> ScriptsSection {
    ctx.project().scripts().cloned().unwrap_or_default()
}

fn rel_pattern(path: &Path, suffix: &str) -> String {
    let base = to_slash(path);
    let base = base.trim_end_matches('/');
    if base.is_empty() || base == "." {
        suffix.to_string()
    } else {
        format!("{base}/{suffix}")
    }
}

/// Declare every catalogue task on `orch`.
///
/// Watch patterns are derived from the project manifest held by `ctx`.
pub fn declare_plugin_tasks(orch: &mut Orchestrator, ctx: &BuildContext) -> Result<()> {
    let scripts = scripts_section(ctx);
    let layout = ctx.project().layout();

    let script_patterns = PatternSet::new(default_script_patterns(&scripts.source_root))?;
    let output_patterns = PatternSet::new([rel_pattern(&layout.scripts_dir, "**/*.js")])?;
    let vendor_patterns = PatternSet::new(&scripts.module_dependencies)?;
    let text_patterns = PatternSet::new(
        scripts
            .text_properties
            .iter()
            .map(|dir| rel_pattern(dir, "**/*.properties")),
    )?;
    let res_patterns = PatternSet::new(static_tree_patterns(StaticTree::Res.dir()))?;
    let web_patterns = PatternSet::new(static_tree_patterns(StaticTree::Web.dir()))?;

    let specs = vec![
        TaskSpec::new(CLEAN).body(PluginStep::Clean),
        TaskSpec::new(PLUGIN_INIT).after([CLEAN]),
        TaskSpec::new(PLUGIN_SCRIPTS)
            .after([PLUGIN_INIT])
            .when(scripts_enabled())
            .body(PluginStep::Scripts),
        TaskSpec::new(PLUGIN_SCRIPT_VENDOR)
            .after([PLUGIN_INIT])
            .when(scripts_enabled())
            .body(PluginStep::ScriptVendor),
        TaskSpec::new(PLUGIN_SCRIPT_DEPS)
            .after([PLUGIN_SCRIPTS, PLUGIN_SCRIPT_VENDOR])
            .when(scripts_enabled())
            .body(PluginStep::ScriptDeps),
        TaskSpec::new(PLUGIN_TEXT)
            .after([PLUGIN_INIT])
            .when(scripts_enabled())
            .body(PluginStep::Text),
        TaskSpec::new(PLUGIN_BUNDLES)
            .after([PLUGIN_INIT])
            .when(bundles_configured())
            .body(PluginStep::Bundles),
        TaskSpec::new(PLUGIN_NG).after([PLUGIN_SCRIPT_DEPS, PLUGIN_TEXT, PLUGIN_BUNDLES]),
        TaskSpec::new(PLUGIN_RES)
            .after([PLUGIN_NG])
            .body(PluginStep::StaticTree(StaticTree::Res)),
        TaskSpec::new(PLUGIN_WEB)
            .after([PLUGIN_NG])
            .body(PluginStep::StaticTree(StaticTree::Web)),
        TaskSpec::new(PLUGIN_BUILD).after([PLUGIN_RES, PLUGIN_WEB]),
        TaskSpec::new(PLUGIN_VERIFY)
            .after([PLUGIN_BUILD])
            .body(PluginStep::Verify),
        TaskSpec::new(PLUGIN_READY)
            .after([PLUGIN_VERIFY])
            .body(PluginStep::Ready),
        TaskSpec::new(VERSION_CHECK).body(PluginStep::VersionCheck),
        TaskSpec::new(WATCH_INIT)
            .after([PLUGIN_READY])
            .body(PluginStep::WatchInit),
        TaskSpec::new(WATCH_SCRIPTS)
            .after([WATCH_INIT])
            .when(scripts_enabled())
            .body(PluginStep::WatchScripts)
            .watching(WatchTrigger::Patterns(script_patterns)),
        TaskSpec::new(WATCH_SCRIPT_DEPS)
            .after([WATCH_INIT])
            .when(scripts_enabled())
            .body(PluginStep::ScriptDeps)
            .watching(WatchTrigger::Patterns(output_patterns)),
        TaskSpec::new(WATCH_SCRIPT_VENDOR)
            .after([WATCH_INIT])
            .when(scripts_enabled())
            .watching(WatchTrigger::Patterns(vendor_patterns))
            .then([PLUGIN_SCRIPT_VENDOR]),
        TaskSpec::new(WATCH_TEXT)
            .after([WATCH_INIT])
            .when(scripts_enabled())
            .watching(WatchTrigger::Patterns(text_patterns))
            .then([PLUGIN_TEXT]),
        TaskSpec::new(WATCH_BUNDLES)
            .after([WATCH_INIT])
            .when(bundles_configured())
            .body(PluginStep::WatchBundles)
            .watching(WatchTrigger::BundleSources),
        TaskSpec::new(WATCH_RES)
            .after([WATCH_INIT])
            .body(PluginStep::StaticTree(StaticTree::Res))
            .watching(WatchTrigger::Patterns(res_patterns)),
        TaskSpec::new(WATCH_WEB)
            .after([WATCH_INIT])
            .body(PluginStep::StaticTree(StaticTree::Web))
            .watching(WatchTrigger::Patterns(web_patterns)),
        TaskSpec::new(WATCH_NG).after([
            WATCH_SCRIPTS,
            WATCH_SCRIPT_DEPS,
            WATCH_SCRIPT_VENDOR,
            WATCH_TEXT,
            WATCH_BUNDLES,
        ]),
        TaskSpec::new(DEV).after([WATCH_NG, WATCH_RES, WATCH_WEB]),
    ];

    for spec in specs {
        orch.declare(spec)?;
    }
    orch.validate()
}

impl TaskBody for PluginStep {
    fn run<'a>(
        &'a self,
        ctx: &'a BuildContext,
        change: Option<&'a FileChangeEvent>,
    ) -> BodyFuture<'a> {
        Box::pin(async move {
            match self {
                PluginStep::Clean => clean(ctx),
                PluginStep::Scripts => run_scripts(ctx, BuildMode::Full),
                PluginStep::WatchScripts => {
                    let mode = match change {
                        Some(ev) => BuildMode::Incremental(vec![ev.path.clone()]),
                        None => BuildMode::Full,
                    };
                    run_scripts(ctx, mode)
                }
                PluginStep::ScriptVendor => {
                    let scripts = scripts_section(ctx);
                    copy_vendor_scripts(
                        ctx.fs(),
                        ctx.root(),
                        &scripts.module_dependencies,
                        &ctx.scripts_dir(),
                    )
                }
                PluginStep::ScriptDeps => script_deps(ctx, change),
                PluginStep::Text => {
                    let scripts = scripts_section(ctx);
                    merge_text_properties(
                        ctx.fs(),
                        ctx.root(),
                        &scripts.text_properties,
                        &ctx.text_dir(),
                    )
                }
                PluginStep::Bundles => bundles(ctx, ctx.project().bundles().iter()),
                PluginStep::WatchBundles => {
                    let affected = match change {
                        Some(ev) => ctx.bundles_containing(&ev.path),
                        None => ctx.project().bundles().iter().map(|b| b.name.clone()).collect(),
                    };
                    bundles(
                        ctx,
                        ctx.project()
                            .bundles()
                            .iter()
                            .filter(|b| affected.contains(&b.name)),
                    )
                }
                PluginStep::StaticTree(tree) => static_tree(ctx, *tree, change),
                PluginStep::Verify => verify(ctx),
                PluginStep::Ready => ready(ctx),
                PluginStep::VersionCheck => version_check(ctx).await,
                PluginStep::WatchInit => watch_init(ctx).await,
            }
        })
    }
}

fn clean(ctx: &BuildContext) -> Result<Vec<OutputFile>> {
    let dir = ctx.plugin_dir();
    info!(dir = ?dir, "removing plugin output");
    ctx.fs().remove_dir_all(&dir)?;
    Ok(Vec::new())
}

fn run_scripts(ctx: &BuildContext, mode: BuildMode) -> Result<Vec<OutputFile>> {
    let scripts = scripts_section(ctx);
    let patterns = PatternSet::new(default_script_patterns(&scripts.source_root))?;
    let output_dir = ctx.scripts_dir();
    process(
        ctx.fs(),
        &ProcessRequest {
            root: ctx.root(),
            patterns: &patterns,
            source_root: &scripts.source_root,
            output_dir: &output_dir,
            mode: &mode,
            source_maps: scripts.source_maps,
        },
    )
}

fn script_deps(ctx: &BuildContext, change: Option<&FileChangeEvent>) -> Result<Vec<OutputFile>> {
    let scripts = scripts_section(ctx);
    let hint: Option<Vec<PathBuf>> = change.map(|ev| vec![ev.path.clone()]);
    let (_, written) = create_dependencies(
        ctx.fs(),
        &DependencyRequest {
            scripts_dir: &ctx.scripts_dir(),
            metadata_dir: &ctx.metadata_dir(),
            externals: &scripts.external_modules,
            incremental_hint: hint.as_deref(),
        },
    )?;
    Ok(vec![written])
}

fn bundles<'b>(
    ctx: &BuildContext,
    selected: impl Iterator<Item = &'b BundleConfig>,
) -> Result<Vec<OutputFile>> {
    let source_maps = scripts_section(ctx).source_maps;
    let mut outputs = Vec::new();
    for bundle in selected {
        let entry = ctx.resolve(&bundle.entry);
        let output_dir = ctx.resolve(&bundle.output_dir);
        let built = process_bundle(
            ctx.fs(),
            &BundleRequest {
                root: ctx.root(),
                entry: &entry,
                output_dir: &output_dir,
                output_name: &bundle.output_name,
                source_maps,
            },
        )?;
        ctx.record_bundle_sources(&bundle.name, built.sources);
        outputs.extend(built.outputs);
    }
    Ok(outputs)
}

fn static_tree(
    ctx: &BuildContext,
    tree: StaticTree,
    change: Option<&FileChangeEvent>,
) -> Result<Vec<OutputFile>> {
    let patterns = PatternSet::new(static_tree_patterns(tree.dir()))?;
    let mode = match change {
        Some(ev) => BuildMode::Incremental(vec![ev.path.clone()]),
        None => BuildMode::Full,
    };
    copy_tree(ctx.fs(), ctx.root(), &patterns, &ctx.plugin_dir(), &mode)
}

/// Output directory backing a plugin point, relative to the plugin root.
fn plugin_point_dir(point: PluginPoint) -> Option<String> {
    match point {
        PluginPoint::Text | PluginPoint::Init => None,
        other => Some(format!("res/{}s", other.as_str())),
    }
}

fn verify(ctx: &BuildContext) -> Result<Vec<OutputFile>> {
    let plugin_dir = ctx.plugin_dir();
    let mut missing = Vec::new();

    for point in &ctx.server().plugin_points {
        if let Some(dir) = plugin_point_dir(*point) {
            if !ctx.fs().is_dir(&plugin_dir.join(&dir)) {
                warn!(plugin_point = %point, dir = %dir, "plugin point has no output");
                missing.push(point.as_str());
            }
        }
    }

    if !missing.is_empty() && ctx.server().strict_mode {
        return Err(SdkError::Config(format!(
            "Plugin points without output in strict mode: {}",
            missing.join(", ")
        )));
    }
    Ok(Vec::new())
}

fn plugin_files(ctx: &BuildContext) -> Result<Vec<PathBuf>> {
    let all = PatternSet::new(["**"])?;
    Ok(collect_matching_files(ctx.fs(), &ctx.plugin_dir(), &all)?)
}

fn ready(ctx: &BuildContext) -> Result<Vec<OutputFile>> {
    let plugin_dir = ctx.plugin_dir();
    let files = plugin_files(ctx)?;
    let hash = compute_tree_hash(ctx.fs(), &plugin_dir, &files)?;
    info!(files = files.len(), tree_hash = %hash, "Done compiling plugin: {}", plugin_dir.display());
    Ok(Vec::new())
}

async fn version_check(ctx: &BuildContext) -> Result<Vec<OutputFile>> {
    let options = ctx.options();
    let checker = VersionChecker::new(ctx.transport(), options.protocol, options.minimum_version);
    let version = checker.check(ctx.server()).await?;
    info!(server_version = %version, minimum = %options.minimum_version, "server version supported");
    ctx.record_server_version(version);
    Ok(Vec::new())
}

async fn watch_init(ctx: &BuildContext) -> Result<Vec<OutputFile>> {
    let Some(sandbox) = ctx.sandbox() else {
        info!("no sandbox configured; changes stay local");
        return Ok(Vec::new());
    };
    let files = plugin_files(ctx)?;
    sandbox.upload(ctx.fs(), &files, true).await;
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{LayoutSection, ProjectConfig, ServerConfig};
    use crate::engine::BuildOptions;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;

    fn ctx(fs: &MockFileSystem, project: ProjectConfig) -> BuildContext {
        BuildContext::new(
            Arc::new(fs.clone()),
            "/p",
            ServerConfig::default(),
            project,
            BuildOptions::with_bundled_minimum().unwrap(),
        )
    }

    fn scripts_project() -> ProjectConfig {
        ProjectConfig::new_unchecked(
            Some(ScriptsSection::default()),
            Vec::new(),
            LayoutSection::default(),
        )
    }

    #[test]
    fn catalogue_declares_a_valid_graph() {
        let fs = MockFileSystem::new();
        let ctx = ctx(&fs, scripts_project());
        let mut orch = Orchestrator::new();
        declare_plugin_tasks(&mut orch, &ctx).unwrap();

        let plan = orch.plan(PLUGIN_READY).unwrap();
        assert_eq!(plan.first().map(String::as_str), Some(CLEAN));
        assert_eq!(plan.last().map(String::as_str), Some(PLUGIN_READY));
        let pos = |t: &str| plan.iter().position(|p| p == t).unwrap();
        assert!(pos(PLUGIN_SCRIPTS) < pos(PLUGIN_SCRIPT_DEPS));
        assert!(pos(PLUGIN_SCRIPT_VENDOR) < pos(PLUGIN_SCRIPT_DEPS));
        assert!(pos(PLUGIN_NG) < pos(PLUGIN_RES));
    }

    #[tokio::test]
    async fn build_without_scripts_section_skips_script_tasks() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/res/img/logo.png", "png");
        let ctx = ctx(&fs, ProjectConfig::default());
        let mut orch = Orchestrator::new();
        declare_plugin_tasks(&mut orch, &ctx).unwrap();

        let report = orch.run(&ctx, PLUGIN_READY).await.unwrap();

        for task in [PLUGIN_SCRIPTS, PLUGIN_SCRIPT_DEPS, PLUGIN_TEXT, PLUGIN_BUNDLES] {
            assert!(report.skipped.iter().any(|t| t == task), "{task} not skipped");
        }
        assert!(fs.is_file(Path::new("/p/plugin/res/img/logo.png")));
    }

    #[tokio::test]
    async fn full_build_writes_scripts_metadata_and_text() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/p/src/app/app.js",
            "/**\n * @module app\n * @requires app.view.tpl\n */\nangular.module('app', []);\n",
        );
        fs.add_file("/p/src/app/view.tpl.html", "<b>{{ x }}</b>\n");
        fs.add_file("/p/lang/text.en.properties", "a = 1\n");
        let project = ProjectConfig::new_unchecked(
            Some(ScriptsSection {
                text_properties: vec![PathBuf::from("lang")],
                source_maps: false,
                ..ScriptsSection::default()
            }),
            Vec::new(),
            LayoutSection::default(),
        );
        let ctx = ctx(&fs, project);
        let mut orch = Orchestrator::new();
        declare_plugin_tasks(&mut orch, &ctx).unwrap();

        orch.run(&ctx, PLUGIN_READY).await.unwrap();

        let metadata = fs
            .read_to_string(Path::new("/p/plugin/res/js/angularjs/metadata/dependencies.json"))
            .unwrap();
        assert!(metadata.contains("\"app.view.tpl\""));
        assert!(fs.is_file(Path::new("/p/plugin/res/js/angularjs/app/view.tpl.js")));
        assert!(fs.is_file(Path::new("/p/plugin/res/lang/feature/text.en.properties")));
    }

    #[tokio::test]
    async fn strict_mode_fails_on_plugin_points_without_output() {
        let fs = MockFileSystem::new();
        let mut server = ServerConfig::default();
        server.plugin_points = vec![PluginPoint::Component, PluginPoint::Text];
        server.strict_mode = true;
        let ctx = BuildContext::new(
            Arc::new(fs.clone()),
            "/p",
            server,
            ProjectConfig::default(),
            BuildOptions::with_bundled_minimum().unwrap(),
        );

        let err = PluginStep::Verify.run(&ctx, None).await.unwrap_err();
        assert!(err.to_string().contains("component"));

        fs.add_file("/p/plugin/res/components/x/x.ftl", "x");
        assert!(PluginStep::Verify.run(&ctx, None).await.is_ok());
    }

    #[test]
    fn relative_patterns_join_cleanly() {
        assert_eq!(rel_pattern(Path::new("res/lang/"), "**/*.properties"), "res/lang/**/*.properties");
        assert_eq!(rel_pattern(Path::new("."), "**/*.js"), "**/*.js");
    }
}
