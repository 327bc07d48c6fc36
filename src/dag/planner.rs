// src/dag/planner.rs

//! Execution planning.
//!
//! A plan is the post-order of a depth-first walk over prerequisites: every
//! task appears after all of its prerequisites, each task appears once, and
//! prerequisites keep their declared order. Planning happens before any body
//! runs, so a cycle or an unknown task aborts the invocation up front.

use std::collections::HashSet;

use crate::dag::graph::TaskGraph;
use crate::engine::TaskName;
use crate::errors::{Result, SdkError};

/// Plan the execution of `targets` (in order) and everything they need.
pub fn plan(graph: &TaskGraph, targets: &[&str]) -> Result<Vec<TaskName>> {
    let mut planner = Planner {
        graph,
        done: HashSet::new(),
        visiting: Vec::new(),
        order: Vec::new(),
    };
    for target in targets {
        planner.visit(target, None)?;
    }
    Ok(planner.order)
}

struct Planner<'a> {
    graph: &'a TaskGraph,
    done: HashSet<&'a str>,
    /// Current recursion path, for cycle reporting.
    visiting: Vec<&'a str>,
    order: Vec<TaskName>,
}

impl<'a> Planner<'a> {
    fn visit(&mut self, name: &str, required_by: Option<&str>) -> Result<()> {
        let graph: &'a TaskGraph = self.graph;
        let Some(name) = graph.tasks().find(|t| *t == name) else {
            return Err(SdkError::TaskNotFound(match required_by {
                Some(parent) => format!("{name} (prerequisite of {parent})"),
                None => name.to_string(),
            }));
        };
        if self.done.contains(name) {
            return Ok(());
        }
        if let Some(pos) = self.visiting.iter().position(|t| *t == name) {
            let mut path: Vec<&str> = self.visiting[pos..].to_vec();
            path.push(name);
            return Err(SdkError::TaskCycle(path.join(" -> ")));
        }

        self.visiting.push(name);
        for dep in graph.dependencies_of(name) {
            self.visit(dep, Some(name))?;
        }
        self.visiting.pop();

        self.done.insert(name);
        self.order.push(name.to_string());
        Ok(())
    }
}
