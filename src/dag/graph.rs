// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::TaskSpec;
use crate::engine::TaskName;
use crate::errors::{Result, SdkError};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct TaskNode {
    /// Prerequisites in declaration order.
    deps: Vec<TaskName>,
    /// Tasks that list this one as a prerequisite.
    dependents: Vec<TaskName>,
}

/// Adjacency view of the declared tasks, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: HashMap<TaskName, TaskNode>,
    /// Names passed to `insert`. A node can exist before its task is declared
    /// when a dependent names it first.
    declared: HashSet<TaskName>,
    /// Declaration order, for deterministic iteration.
    order: Vec<TaskName>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task node. Dependents are linked for prerequisites already
    /// present and for those declared later.
    pub fn insert(&mut self, spec: &TaskSpec) {
        let name = spec.name.clone();
        if self.declared.insert(name.clone()) {
            self.order.push(name.clone());
        }

        let dependents = self
            .nodes
            .get(&name)
            .map(|n| n.dependents.clone())
            .unwrap_or_default();
        self.nodes.insert(
            name.clone(),
            TaskNode {
                deps: spec.prerequisites.clone(),
                dependents,
            },
        );

        for dep in &spec.prerequisites {
            let node = self.nodes.entry(dep.clone()).or_default();
            if !node.dependents.contains(&name) {
                node.dependents.push(name.clone());
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// Task names in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Check the whole declaration: every prerequisite must be declared and
    /// the prerequisite relation must be acyclic.
    pub fn validate(&self) -> Result<()> {
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                if !self.contains(dep) {
                    return Err(SdkError::TaskNotFound(format!(
                        "{dep} (prerequisite of {name})"
                    )));
                }
            }
        }

        // Edge direction: prerequisite -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            graph.add_node(name.as_str());
        }
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(SdkError::TaskCycle(format!(
                "cycle in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
