#![allow(dead_code)]

pub use plugin_sdk_test_utils::builders;
pub use plugin_sdk_test_utils::fakes;
pub use plugin_sdk_test_utils::{init_tracing, with_timeout};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugin_sdk::config::{ProjectConfig, ServerConfig};
use plugin_sdk::engine::{BuildContext, BuildOptions};
use plugin_sdk::fs::{FileSystem, RealFileSystem};

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn read_file(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

/// Context over the real filesystem rooted at `root`.
pub fn real_context(root: &Path, server: ServerConfig, project: ProjectConfig) -> BuildContext {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let root = root.canonicalize().unwrap();
    BuildContext::new(
        fs,
        root,
        server,
        project,
        BuildOptions::with_bundled_minimum().unwrap(),
    )
}
