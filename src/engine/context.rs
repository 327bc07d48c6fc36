// src/engine/context.rs

//! Explicit per-invocation state.
//!
//! Everything a task body needs (configuration, filesystem, collaborators and
//! the little state that outlives a single task) is carried here. One context
//! is built at startup and passed by reference to every component.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use crate::config::{ProjectConfig, ServerConfig};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::server::{ReqwestTransport, ServerVersion, VersionTransport};
use crate::sync::SandboxSync;
use crate::types::VersionProtocol;

/// Invocation-wide switches coming from the command line.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Print the plan instead of running task bodies.
    pub dry_run: bool,
    /// Oldest server version the version check accepts.
    pub minimum_version: ServerVersion,
    pub protocol: VersionProtocol,
}

impl BuildOptions {
    /// Options with the bundled minimum server version.
    pub fn with_bundled_minimum() -> Result<Self> {
        Ok(Self {
            dry_run: false,
            minimum_version: ServerVersion::bundled_minimum()?,
            protocol: VersionProtocol::default(),
        })
    }
}

pub struct BuildContext {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    server: ServerConfig,
    project: ProjectConfig,
    options: BuildOptions,
    transport: Arc<dyn VersionTransport>,
    sandbox: Option<SandboxSync>,
    /// Version reported by the server once the version check has run.
    server_version: OnceLock<ServerVersion>,
    /// Transitive source set per bundle name, from the latest build.
    bundle_sources: Mutex<HashMap<String, BTreeSet<PathBuf>>>,
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("sandbox", &self.sandbox.is_some())
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        server: ServerConfig,
        project: ProjectConfig,
        options: BuildOptions,
    ) -> Self {
        Self {
            fs,
            root: root.into(),
            server,
            project,
            options,
            transport: Arc::new(ReqwestTransport::new()),
            sandbox: None,
            server_version: OnceLock::new(),
            bundle_sources: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn VersionTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_sandbox(mut self, sandbox: SandboxSync) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn shared_fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn transport(&self) -> &dyn VersionTransport {
        self.transport.as_ref()
    }

    pub fn sandbox(&self) -> Option<&SandboxSync> {
        self.sandbox.as_ref()
    }

    /// Resolve a project-relative path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        crate::watch::path_utils::absolutize(&self.root, path)
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.resolve(&self.project.layout().plugin_dir)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.resolve(&self.project.layout().scripts_dir)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.resolve(&self.project.layout().metadata_dir)
    }

    pub fn text_dir(&self) -> PathBuf {
        self.resolve(&self.project.layout().text_dir)
    }

    pub fn record_server_version(&self, version: ServerVersion) {
        if self.server_version.set(version).is_err() {
            debug!(%version, "server version already recorded");
        }
    }

    pub fn server_version(&self) -> Option<ServerVersion> {
        self.server_version.get().copied()
    }

    pub fn record_bundle_sources(&self, bundle: &str, sources: BTreeSet<PathBuf>) {
        self.bundle_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bundle.to_string(), sources);
    }

    /// Names of the bundles whose latest source set contains `path`.
    pub fn bundles_containing(&self, path: &Path) -> Vec<String> {
        let sources = self
            .bundle_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = sources
            .iter()
            .filter(|(_, set)| set.contains(path))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn ctx() -> BuildContext {
        BuildContext::new(
            Arc::new(MockFileSystem::new()),
            "/p",
            ServerConfig::default(),
            ProjectConfig::default(),
            BuildOptions::with_bundled_minimum().unwrap(),
        )
    }

    #[test]
    fn layout_dirs_resolve_against_root() {
        let ctx = ctx();
        assert_eq!(ctx.plugin_dir(), PathBuf::from("/p/plugin"));
        assert_eq!(
            ctx.metadata_dir(),
            PathBuf::from("/p/plugin/res/js/angularjs/metadata")
        );
    }

    #[test]
    fn bundle_sources_are_looked_up_by_path() {
        let ctx = ctx();
        ctx.record_bundle_sources("widget", [PathBuf::from("/p/src/a.js")].into());
        ctx.record_bundle_sources("admin", [PathBuf::from("/p/src/b.js")].into());

        assert_eq!(ctx.bundles_containing(Path::new("/p/src/a.js")), vec!["widget"]);
        assert!(ctx.bundles_containing(Path::new("/p/src/c.js")).is_empty());
    }

    #[test]
    fn server_version_is_recorded_once() {
        let ctx = ctx();
        assert_eq!(ctx.server_version(), None);
        ctx.record_server_version(ServerVersion::new(23, 4));
        ctx.record_server_version(ServerVersion::new(1, 0));
        assert_eq!(ctx.server_version(), Some(ServerVersion::new(23, 4)));
    }
}
