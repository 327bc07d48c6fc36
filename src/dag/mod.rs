// src/dag/mod.rs

//! Task declarations and the prerequisite graph.
//!
//! - [`task`] defines task specs: prerequisites, body, run-time condition
//!   and watch triggers.
//! - [`graph`] holds the adjacency view and whole-graph validation.
//! - [`planner`] turns a requested task into an execution order, detecting
//!   cycles before anything runs.

pub mod graph;
pub mod planner;
pub mod task;

pub use graph::TaskGraph;
pub use planner::plan;
pub use task::{Condition, TaskKind, TaskRunState, TaskSpec, WatchSpec, WatchTrigger};
