// src/exec/mod.rs

//! Task bodies.
//!
//! - [`TaskBody`] is the seam between the orchestrator and the work a task
//!   does. The orchestrator only ever sees boxed futures, so production
//!   steps and test doubles plug in the same way.
//! - [`catalogue`] declares the fixed set of plugin build tasks and
//!   implements their bodies on top of [`crate::build`], [`crate::server`]
//!   and [`crate::sync`].

use std::future::Future;
use std::pin::Pin;

use crate::build::OutputFile;
use crate::engine::BuildContext;
use crate::errors::Result;
use crate::watch::FileChangeEvent;

pub mod catalogue;

pub use catalogue::{declare_plugin_tasks, PluginStep};

/// Future returned by a task body.
pub type BodyFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<OutputFile>>> + Send + 'a>>;

/// The work behind a task.
///
/// `change` is `None` for a regular run and carries the triggering change
/// when a watch task handles a file event. The returned outputs are what the
/// body wrote; unchanged ones are flagged so sync can skip them.
pub trait TaskBody: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a BuildContext, change: Option<&'a FileChangeEvent>)
    -> BodyFuture<'a>;
}

/// Synchronous closure adapted into a [`TaskBody`].
pub struct FnBody<F>(F);

/// Wrap a closure as a task body.
pub fn from_fn<F>(f: F) -> FnBody<F>
where
    F: Fn(&BuildContext, Option<&FileChangeEvent>) -> Result<Vec<OutputFile>> + Send + Sync,
{
    FnBody(f)
}

impl<F> TaskBody for FnBody<F>
where
    F: Fn(&BuildContext, Option<&FileChangeEvent>) -> Result<Vec<OutputFile>> + Send + Sync,
{
    fn run<'a>(
        &'a self,
        ctx: &'a BuildContext,
        change: Option<&'a FileChangeEvent>,
    ) -> BodyFuture<'a> {
        let result = (self.0)(ctx, change);
        Box::pin(async move { result })
    }
}
