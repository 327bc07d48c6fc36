// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling ordered glob pattern sets (`!` negation, last match wins).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Content hashing, so repeated notifications for an unchanged file and
//!   outputs identical to what is on disk are ignored.
//!
//! It does **not** know about tasks; it only turns filesystem changes into
//! [`FileChangeEvent`]s for the engine.

use std::path::PathBuf;
use std::time::SystemTime;

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{collect_matching_files, PatternSet};
pub use watcher::{spawn_watcher, WatcherHandle};

/// One observed change to a file.
///
/// Consumed by the watch tasks it matches; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    pub timestamp: SystemTime,
    /// Pattern that selected the file, filled in when a watch task claims it.
    pub pattern: Option<String>,
}

impl FileChangeEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamp: SystemTime::now(),
            pattern: None,
        }
    }

    pub fn with_pattern(&self, pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..self.clone()
        }
    }
}
