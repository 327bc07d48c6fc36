// src/sync/mod.rs

//! Change-triggered sandbox sync.
//!
//! During development every changed output of the plugin tree is pushed to a
//! sandbox so it can be previewed live. Sync is best-effort: a failed file is
//! logged and the rest of the batch still goes out.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

pub mod sandbox;

pub use sandbox::{HttpSandbox, LocalDirSandbox};

pub type SyncFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Where synced files go.
pub trait SandboxClient: Send + Sync {
    /// Store one file under its path relative to the plugin root.
    fn upload<'a>(&'a self, rel_path: &'a str, contents: Vec<u8>) -> SyncFuture<'a>;

    /// Ask the sandbox to pick up a complete new plugin tree.
    fn reload(&self) -> SyncFuture<'_>;
}

/// Outcome of one sync batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<PathBuf>,
}

/// Sync stage between the build and a [`SandboxClient`].
#[derive(Clone)]
pub struct SandboxSync {
    client: Arc<dyn SandboxClient>,
    plugin_dir: PathBuf,
}

impl std::fmt::Debug for SandboxSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxSync")
            .field("plugin_dir", &self.plugin_dir)
            .finish_non_exhaustive()
    }
}

impl SandboxSync {
    pub fn new(client: Arc<dyn SandboxClient>, plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            plugin_dir: plugin_dir.into(),
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Upload every file received, in order.
    ///
    /// With `full_sync` the batch is a complete plugin tree and the sandbox
    /// is asked to reload once it is through. Without it the batch is the
    /// output of a single change, already filtered by the caller.
    pub async fn upload(
        &self,
        fs: &dyn FileSystem,
        files: &[PathBuf],
        full_sync: bool,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        for file in files {
            let Some(rel) = relative_str(&self.plugin_dir, file) else {
                warn!(file = ?file, "not part of the plugin tree; not synced");
                report.failed.push(file.clone());
                continue;
            };

            let result = match fs.read(file) {
                Ok(bytes) => self.client.upload(&rel, bytes).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => {
                    debug!(file = %rel, "synced");
                    report.uploaded.push(rel);
                }
                Err(err) => {
                    warn!(file = %rel, error = %err, "sandbox upload failed; continuing");
                    report.failed.push(file.clone());
                }
            }
        }

        if full_sync {
            if let Err(err) = self.client.reload().await {
                warn!(error = %err, "sandbox reload failed");
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            full_sync,
            "sandbox sync finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[derive(Default)]
    struct Flaky {
        uploaded: Mutex<Vec<String>>,
        reloads: Mutex<usize>,
    }

    impl SandboxClient for Flaky {
        fn upload<'a>(&'a self, rel_path: &'a str, _contents: Vec<u8>) -> SyncFuture<'a> {
            Box::pin(async move {
                if rel_path.contains("bad") {
                    anyhow::bail!("503 from sandbox");
                }
                self.uploaded.lock().unwrap().push(rel_path.to_string());
                Ok(())
            })
        }

        fn reload(&self) -> SyncFuture<'_> {
            Box::pin(async move {
                *self.reloads.lock().unwrap() += 1;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let fs = MockFileSystem::new();
        for f in ["a.js", "bad.js", "c.js"] {
            fs.add_file(format!("/p/plugin/{f}"), "x");
        }
        let client = Arc::new(Flaky::default());
        let sync = SandboxSync::new(client.clone(), "/p/plugin");

        let files: Vec<PathBuf> = ["a.js", "bad.js", "missing.js", "c.js"]
            .iter()
            .map(|f| PathBuf::from(format!("/p/plugin/{f}")))
            .collect();
        let report = sync.upload(&fs, &files, false).await;

        assert_eq!(report.uploaded, vec!["a.js", "c.js"]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(*client.reloads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn full_sync_reloads_after_the_batch() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/plugin/res/a.txt", "a");
        let client = Arc::new(Flaky::default());
        let sync = SandboxSync::new(client.clone(), "/p/plugin");

        let report = sync
            .upload(&fs, &[PathBuf::from("/p/plugin/res/a.txt")], true)
            .await;

        assert_eq!(report.uploaded, vec!["res/a.txt"]);
        assert_eq!(*client.reloads.lock().unwrap(), 1);
    }
}
