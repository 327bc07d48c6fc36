// src/engine/core.rs

//! Task orchestration.
//!
//! The [`Orchestrator`] owns the declared tasks and their per-invocation
//! state. It:
//! - plans a requested task and its prerequisites, failing on cycles before
//!   anything runs
//! - runs each task at most once per invocation (completed tasks are
//!   memoized)
//! - evaluates a task's condition right before its body and completes the
//!   task as a no-op when the condition is false
//! - subscribes watch tasks instead of running them, and on every matching
//!   file change runs their body and re-runs their follow-up tasks without
//!   touching upstream tasks that already completed

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::build::OutputFile;
use crate::dag::{plan, TaskGraph, TaskKind, TaskRunState, TaskSpec, WatchTrigger};
use crate::engine::{BuildContext, TaskName};
use crate::errors::{Result, SdkError};
use crate::watch::path_utils::relative_str;
use crate::watch::FileChangeEvent;

/// What one run, re-run or change dispatch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks that completed, in completion order. Grouping nodes included.
    pub executed: Vec<TaskName>,
    /// Tasks completed as no-ops because their condition was false.
    pub skipped: Vec<TaskName>,
    pub outputs: Vec<OutputFile>,
}

impl RunReport {
    fn merge(&mut self, other: RunReport) {
        self.executed.extend(other.executed);
        self.skipped.extend(other.skipped);
        self.outputs.extend(other.outputs);
    }

    /// Outputs whose bytes changed on disk.
    pub fn changed_outputs(&self) -> impl Iterator<Item = &OutputFile> {
        self.outputs.iter().filter(|o| o.changed)
    }
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    specs: HashMap<TaskName, TaskSpec>,
    graph: TaskGraph,
    states: HashMap<TaskName, TaskRunState>,
    /// Watch tasks subscribed so far, in subscription order.
    subscriptions: Vec<TaskName>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a task. Names are unique.
    pub fn declare(&mut self, spec: TaskSpec) -> Result<()> {
        if self.specs.contains_key(&spec.name) {
            return Err(SdkError::Config(format!(
                "task '{}' is declared twice",
                spec.name
            )));
        }
        debug!(task = %spec.name, prerequisites = ?spec.prerequisites, "declared task");
        self.graph.insert(&spec);
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Check the full declaration: known prerequisites and follow-up tasks,
    /// no cycles.
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        for name in self.graph.tasks() {
            if let Some(watch) = self.specs[name].watch_spec() {
                for then in &watch.then {
                    if !self.specs.contains_key(then) {
                        return Err(SdkError::TaskNotFound(format!(
                            "{then} (follow-up of {name})"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn spec(&self, name: &str) -> Option<&TaskSpec> {
        self.specs.get(name)
    }

    /// Execution order for `name`, prerequisites first.
    pub fn plan(&self, name: &str) -> Result<Vec<TaskName>> {
        plan(&self.graph, &[name])
    }

    pub fn state(&self, name: &str) -> TaskRunState {
        self.states.get(name).copied().unwrap_or_default()
    }

    pub fn subscriptions(&self) -> &[TaskName] {
        &self.subscriptions
    }

    /// Run `name` and its prerequisites. Tasks already completed in this
    /// invocation are not run again.
    pub async fn run(&mut self, ctx: &BuildContext, name: &str) -> Result<RunReport> {
        let order = self.plan(name)?;
        debug!(task = %name, ?order, "execution plan");
        self.run_plan(ctx, &order).await
    }

    /// Run `names` again even though they completed, without re-running
    /// their completed prerequisites.
    pub async fn rerun(&mut self, ctx: &BuildContext, names: &[TaskName]) -> Result<RunReport> {
        let targets: Vec<&str> = names.iter().map(String::as_str).collect();
        let order = plan(&self.graph, &targets)?;
        for name in names {
            self.states.insert(name.clone(), TaskRunState::NotRun);
        }
        self.run_plan(ctx, &order).await
    }

    async fn run_plan(&mut self, ctx: &BuildContext, order: &[TaskName]) -> Result<RunReport> {
        let mut report = RunReport::default();

        for name in order {
            if self.state(name).is_complete() {
                continue;
            }
            let spec = self.specs[name.as_str()].clone();

            if let Some(condition) = spec.condition {
                if !condition.holds(ctx) {
                    info!(task = %name, condition = condition.label, "skipping task");
                    self.states.insert(name.clone(), TaskRunState::Skipped);
                    report.skipped.push(name.clone());
                    continue;
                }
            }

            match &spec.kind {
                TaskKind::Watch(_) => {
                    if !self.subscriptions.contains(name) {
                        info!(task = %name, "watching");
                        self.subscriptions.push(name.clone());
                    }
                }
                TaskKind::OneShot => {
                    if let Some(body) = &spec.body {
                        info!(task = %name, "starting task");
                        match body.run(ctx, None).await {
                            Ok(outputs) => {
                                debug!(task = %name, outputs = outputs.len(), "task finished");
                                report.outputs.extend(outputs);
                            }
                            Err(err) => {
                                error!(task = %name, error = %err, "task failed");
                                self.states.insert(name.clone(), TaskRunState::Failed);
                                return Err(err);
                            }
                        }
                    }
                }
            }

            self.states.insert(name.clone(), TaskRunState::Done);
            report.executed.push(name.clone());
        }

        Ok(report)
    }

    /// Hand a file change to every subscribed watch task it matches.
    ///
    /// Failures are logged, never returned: a broken source must not stop the
    /// watcher, which keeps waiting for the next change.
    pub async fn dispatch_change(
        &mut self,
        ctx: &BuildContext,
        event: &FileChangeEvent,
    ) -> RunReport {
        let mut report = RunReport::default();

        for name in self.subscriptions.clone() {
            let spec = self.specs[name.as_str()].clone();
            let Some(watch) = spec.watch_spec() else {
                continue;
            };
            let Some(pattern) = self.claim(ctx, &watch.trigger, event) else {
                continue;
            };
            let claimed = event.with_pattern(pattern);
            info!(task = %name, file = ?claimed.path, pattern = ?claimed.pattern, "change detected");

            if let Some(body) = &spec.body {
                match body.run(ctx, Some(&claimed)).await {
                    Ok(outputs) => report.outputs.extend(outputs),
                    Err(err) => {
                        error!(task = %name, error = %err, "watch task failed; waiting for next change");
                        continue;
                    }
                }
            }

            if !watch.then.is_empty() {
                match self.rerun(ctx, &watch.then).await {
                    Ok(sub) => report.merge(sub),
                    Err(err) => {
                        error!(task = %name, error = %err, "follow-up tasks failed; waiting for next change");
                    }
                }
            }
            report.executed.push(name.clone());
        }

        if report.executed.is_empty() {
            debug!(file = ?event.path, "change matched no watch task");
        }
        report
    }

    /// The pattern under which `trigger` claims `event`, if it does.
    fn claim(
        &self,
        ctx: &BuildContext,
        trigger: &WatchTrigger,
        event: &FileChangeEvent,
    ) -> Option<String> {
        match trigger {
            WatchTrigger::Patterns(set) => {
                let Some(rel) = relative_str(ctx.root(), &event.path) else {
                    warn!(file = ?event.path, "change outside project root");
                    return None;
                };
                set.matching_pattern(&rel).map(str::to_string)
            }
            WatchTrigger::BundleSources => {
                let bundles = ctx.bundles_containing(&event.path);
                if bundles.is_empty() {
                    None
                } else {
                    Some(format!("bundle:{}", bundles.join(",")))
                }
            }
        }
    }
}
