// src/watch/event_handler.rs

//! Turning raw filesystem notifications into change events.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::path_utils::relative_str;
use crate::watch::FileChangeEvent;

/// Top-level directories whose changes never concern the build.
pub const IGNORED_DIRS: &[&str] = &[".git", "node_modules", ".tmp", "target"];

/// What happened to one notified path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDisposition {
    Forwarded,
    Ignored,
    /// The runtime channel is closed; the watcher loop should stop.
    Closed,
}

/// Filter one notified path and forward it to the runtime.
///
/// Paths outside `root`, under [`IGNORED_DIRS`], directories, removed files
/// and files whose content did not change since the last event are dropped.
pub async fn process_file_change(
    fs: &dyn FileSystem,
    root: &Path,
    path: &Path,
    cache: &mut FileCache,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> ChangeDisposition {
    let Some(rel) = relative_str(root, path) else {
        warn!(
            "could not relativize path {:?} against root {:?}",
            path, root
        );
        return ChangeDisposition::Ignored;
    };

    let top = rel.split('/').next().unwrap_or_default();
    if IGNORED_DIRS.contains(&top) {
        return ChangeDisposition::Ignored;
    }

    if !fs.is_file(path) {
        if !fs.exists(path) {
            debug!(rel = %rel, "file removed; nothing to rebuild");
            cache.invalidate(path);
        }
        return ChangeDisposition::Ignored;
    }

    match cache.observe(fs, path) {
        Ok(false) => return ChangeDisposition::Ignored,
        Ok(true) => {}
        Err(err) => {
            // Unreadable right now (e.g. mid-write); let the build decide.
            debug!(rel = %rel, error = %err, "could not hash changed file");
        }
    }

    debug!(rel = %rel, "forwarding file change");
    match runtime_tx
        .send(RuntimeEvent::FileChanged(FileChangeEvent::new(path)))
        .await
    {
        Ok(()) => ChangeDisposition::Forwarded,
        Err(err) => {
            warn!("failed to send RuntimeEvent::FileChanged: {err}");
            ChangeDisposition::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test]
    async fn forwards_once_per_content_change() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.js", "a");
        let (tx, mut rx) = mpsc::channel(8);
        let mut cache = FileCache::new();
        let root = Path::new("/p");
        let path = Path::new("/p/src/a.js");

        assert_eq!(
            process_file_change(&fs, root, path, &mut cache, &tx).await,
            ChangeDisposition::Forwarded
        );
        assert_eq!(
            process_file_change(&fs, root, path, &mut cache, &tx).await,
            ChangeDisposition::Ignored
        );

        match rx.recv().await {
            Some(RuntimeEvent::FileChanged(ev)) => assert_eq!(ev.path, path),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ignores_vcs_dirs_outside_paths_and_missing_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/.git/index", "x");
        let (tx, _rx) = mpsc::channel(8);
        let mut cache = FileCache::new();
        let root = Path::new("/p");

        for path in ["/p/.git/index", "/elsewhere/a.js", "/p/src/gone.js"] {
            assert_eq!(
                process_file_change(&fs, root, Path::new(path), &mut cache, &tx).await,
                ChangeDisposition::Ignored
            );
        }
    }

    #[tokio::test]
    async fn closed_runtime_is_reported() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.js", "a");
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let disposition =
            process_file_change(&fs, Path::new("/p"), Path::new("/p/a.js"), &mut FileCache::new(), &tx)
                .await;
        assert_eq!(disposition, ChangeDisposition::Closed);
    }
}
