// src/dag/task.rs

//! Task declarations.

use std::fmt;
use std::sync::Arc;

use crate::engine::{BuildContext, TaskName};
use crate::exec::TaskBody;
use crate::watch::patterns::PatternSet;

/// Predicate deciding at run time whether a task body runs.
///
/// A task whose condition is false completes as a no-op; its prerequisites
/// have still run.
#[derive(Clone, Copy)]
pub struct Condition {
    /// Shown in logs when the task is skipped.
    pub label: &'static str,
    pub check: fn(&BuildContext) -> bool,
}

impl Condition {
    pub fn new(label: &'static str, check: fn(&BuildContext) -> bool) -> Self {
        Self { label, check }
    }

    pub fn holds(&self, ctx: &BuildContext) -> bool {
        (self.check)(ctx)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.label).finish()
    }
}

/// Which file changes a watch task reacts to.
#[derive(Debug, Clone)]
pub enum WatchTrigger {
    /// Project-relative paths selected by a pattern set.
    Patterns(PatternSet),
    /// Any file in the transitive source set of a bundle built so far.
    BundleSources,
}

#[derive(Debug, Clone)]
pub struct WatchSpec {
    pub trigger: WatchTrigger,
    /// One-shot tasks re-run after the watch body on every matching change.
    /// Their already completed prerequisites are not re-run.
    pub then: Vec<TaskName>,
}

#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Runs its body at most once per invocation.
    OneShot,
    /// Running it subscribes the task to file changes; the body then runs
    /// once per matching change.
    Watch(WatchSpec),
}

/// A declared task.
#[derive(Clone)]
pub struct TaskSpec {
    pub name: TaskName,
    pub prerequisites: Vec<TaskName>,
    /// `None` makes the task a pure grouping node.
    pub body: Option<Arc<dyn TaskBody>>,
    pub condition: Option<Condition>,
    pub kind: TaskKind,
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("has_body", &self.body.is_some())
            .field("condition", &self.condition)
            .field("kind", &self.kind)
            .finish()
    }
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            prerequisites: Vec::new(),
            body: None,
            condition: None,
            kind: TaskKind::OneShot,
        }
    }

    /// Add prerequisites, in order.
    pub fn after<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.prerequisites
            .extend(prerequisites.into_iter().map(Into::into));
        self
    }

    pub fn body(mut self, body: impl TaskBody + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn watching(mut self, trigger: WatchTrigger) -> Self {
        self.kind = TaskKind::Watch(WatchSpec {
            trigger,
            then: Vec::new(),
        });
        self
    }

    /// Tasks to re-run after each change handled by this watch task.
    pub fn then<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        if let TaskKind::Watch(spec) = &mut self.kind {
            spec.then.extend(tasks.into_iter().map(Into::into));
        }
        self
    }

    pub fn is_watch(&self) -> bool {
        matches!(self.kind, TaskKind::Watch(_))
    }

    pub fn watch_spec(&self) -> Option<&WatchSpec> {
        match &self.kind {
            TaskKind::Watch(spec) => Some(spec),
            TaskKind::OneShot => None,
        }
    }
}

/// Per-invocation state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskRunState {
    #[default]
    NotRun,
    /// Body ran (or the task is a grouping node) and succeeded.
    Done,
    /// Condition was false.
    Skipped,
    Failed,
}

impl TaskRunState {
    /// Whether the task has settled for this invocation.
    pub fn is_complete(self) -> bool {
        matches!(self, TaskRunState::Done | TaskRunState::Skipped)
    }
}
