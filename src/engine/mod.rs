// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the per-invocation [`BuildContext`] every task body receives
//! - the [`Orchestrator`], which runs tasks in prerequisite order, memoizes
//!   completed ones, evaluates conditions and routes file changes to the
//!   subscribed watch tasks
//! - the runtime event loop that reacts to:
//!   - file changes from the watcher
//!   - shutdown signals
//!
//! The orchestration semantics live in [`core`]; the async event loop that
//! feeds it and syncs the results is implemented in [`runtime`].

use crate::watch::FileChangeEvent;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Events flowing into the runtime from the watcher and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A watched file changed.
    FileChanged(FileChangeEvent),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod context;
pub mod core;
pub mod runtime;

pub use context::{BuildContext, BuildOptions};
pub use core::{Orchestrator, RunReport};
pub use runtime::Runtime;
