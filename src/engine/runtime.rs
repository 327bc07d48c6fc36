// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{BuildContext, Orchestrator, RuntimeEvent};
use crate::errors::Result;
use crate::watch::FileChangeEvent;

/// Drives the watch phase.
///
/// Reads [`RuntimeEvent`]s one at a time, hands file changes to the
/// orchestrator and pipes the outputs that actually changed into the sandbox
/// sync. Each change is handled to completion before the next one is read.
pub struct Runtime {
    orchestrator: Orchestrator,
    ctx: BuildContext,
    event_rx: mpsc::Receiver<RuntimeEvent>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("subscriptions", &self.orchestrator.subscriptions())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        orchestrator: Orchestrator,
        ctx: BuildContext,
        event_rx: mpsc::Receiver<RuntimeEvent>,
    ) -> Self {
        Self {
            orchestrator,
            ctx,
            event_rx,
        }
    }

    /// Main event loop. Returns when shutdown is requested or every sender
    /// is gone.
    pub async fn run(mut self) -> Result<()> {
        info!(
            watching = self.orchestrator.subscriptions().len(),
            "watch runtime started"
        );

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::FileChanged(change) => self.handle_change(change).await,
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; stopping runtime");
                    break;
                }
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn handle_change(&mut self, change: FileChangeEvent) {
        let report = self.orchestrator.dispatch_change(&self.ctx, &change).await;

        let changed: Vec<PathBuf> = report.changed_outputs().map(|o| o.path.clone()).collect();
        debug!(
            file = ?change.path,
            tasks = ?report.executed,
            changed = changed.len(),
            "change handled"
        );

        if changed.is_empty() {
            return;
        }
        if let Some(sandbox) = self.ctx.sandbox() {
            sandbox.upload(self.ctx.fs(), &changed, false).await;
        }
    }
}
