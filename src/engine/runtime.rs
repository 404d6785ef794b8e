// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::bus::Action;
use crate::engine::ScheduledCall;
use crate::errors::Result;
use crate::ops::OperationBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the workflow core in response to `RuntimeEvent`s,
/// and delegates external operation calls to an `OperationBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels and handing calls to the backend.
pub struct Runtime<A: Action, B: OperationBackend> {
    core: CoreRuntime<A>,
    event_rx: mpsc::Receiver<RuntimeEvent<A>>,
    backend: B,
}

impl<A: Action, B: OperationBackend> fmt::Debug for Runtime<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<A: Action, B: OperationBackend> Runtime<A, B> {
    pub fn new(
        core: CoreRuntime<A>,
        event_rx: mpsc::Receiver<RuntimeEvent<A>>,
        backend: B,
    ) -> Self {
        Self {
            core,
            event_rx,
            backend,
        }
    }

    /// Main event loop.
    ///
    /// - Runs any work already pending in the core (roots started before
    ///   the loop).
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the
    ///   core.
    /// - Executes commands returned by the core (dispatch calls, exit).
    /// - An idle exit is deferred while events are still queued, so every
    ///   action seeded before the loop started gets processed.
    ///
    /// Returns the core so callers can inspect final state.
    pub async fn run(mut self) -> Result<CoreRuntime<A>> {
        info!(policies = self.core.registrar().len(), "sagaflow runtime started");

        let initial = self.core.pump();
        self.execute_step(initial).await?;

        if self.core.idle_exit_due() && self.event_rx.is_empty() {
            info!("nothing queued and nothing running; exiting");
            return Ok(self.core);
        }

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            let idle_exit = step.commands.contains(&CoreCommand::RequestExit);
            if !self.execute_step(step).await? {
                if idle_exit && !self.event_rx.is_empty() {
                    debug!(queued = self.event_rx.len(), "idle exit deferred; events still queued");
                    continue;
                }
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!(
            live = self.core.supervisor().live_count(),
            "runtime exiting"
        );
        Ok(self.core)
    }

    /// Execute the commands of one step; returns `keep_running`.
    async fn execute_step(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            match command {
                CoreCommand::DispatchCalls(calls) => self.dispatch(calls).await?,
                CoreCommand::RequestExit => info!("core issued RequestExit command"),
            }
        }
        Ok(step.keep_running)
    }

    async fn dispatch(&mut self, calls: Vec<ScheduledCall>) -> Result<()> {
        if calls.is_empty() {
            return Ok(());
        }

        let ops: Vec<_> = calls.iter().map(|c| c.operation.as_str()).collect();
        let ids: Vec<_> = calls.iter().map(|c| c.call.as_u64()).collect();
        debug!(?ops, ?ids, "dispatching operation calls");

        self.backend.dispatch_calls(calls).await
    }
}
