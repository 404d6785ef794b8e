// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use serde_json::Value;
use tracing::{debug, trace};

use crate::bus::Action;
use crate::effect::Resume;
use crate::engine::core::CoreRuntime;
use crate::engine::interpreter::{Interpreter, TurnEnd, drop_subscriptions};
use crate::engine::task_info::ScheduledCall;
use crate::engine::CallId;
use crate::errors::{OperationError, WorkflowError};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Hand these calls to the operation backend.
    DispatchCalls(Vec<ScheduledCall>),
    /// Request that the process exits (used for `--once` when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    /// All calls requested by this step, in order.
    pub fn calls(&self) -> impl Iterator<Item = &ScheduledCall> {
        self.commands.iter().flat_map(|cmd| match cmd {
            CoreCommand::DispatchCalls(calls) => calls.as_slice(),
            CoreCommand::RequestExit => &[],
        })
    }
}

/// Handle an action published by an external actor.
///
/// The reducer sees the action before it is queued, matching what workflow
/// `Emit`s do.
pub fn handle_publish<A: Action>(core: &mut CoreRuntime<A>, action: A) -> CoreStep {
    debug!(kind = %action.kind(), "external action published");
    core.store.reduce(&action);
    core.bus.publish(action);
    drain(core, true)
}

/// Handle the settlement of an external operation call.
///
/// Settlements for abandoned calls (their instance was cancelled) are
/// discarded: a cancelled instance is never resumed.
pub fn handle_settlement<A: Action>(
    core: &mut CoreRuntime<A>,
    call: CallId,
    result: Result<Value, OperationError>,
) -> CoreStep {
    match core.supervisor.settle_call(call) {
        Some((task, operation)) => {
            let resume = match result {
                Ok(value) => {
                    debug!(%task, %call, %operation, "operation succeeded");
                    Resume::Value(value)
                }
                Err(err) => {
                    debug!(%task, %call, %operation, error = %err, "operation failed");
                    Resume::Failure(WorkflowError::OperationFailure {
                        operation,
                        message: err.to_string(),
                    })
                }
            };
            core.supervisor.make_ready(task, resume);
        }
        None => {
            debug!(%call, "discarding settlement for abandoned or unknown call");
        }
    }
    drain(core, true)
}

/// Run the core until no queued action and no ready instance remain.
///
/// Each queued action is delivered completely (one-shot waiters, handlers,
/// then dispatch policies) before the next ready instance gets a turn, so
/// actions emitted by one turn keep their emission order.
pub fn drain<A: Action>(core: &mut CoreRuntime<A>, check_exit: bool) -> CoreStep {
    let mut calls = Vec::new();

    loop {
        if let Some(delivery) = core.bus.deliver_next() {
            for task in delivery.woken {
                if !core.supervisor.wake_waiter(task, delivery.action.clone()) {
                    trace!(%task, "waiter no longer parked on event; skipping");
                }
            }

            let report = core.registrar.dispatch(&delivery.action, &mut core.supervisor);
            drop_subscriptions(&mut core.bus, &report.superseded);
            continue;
        }

        if let Some((task, resume)) = core.supervisor.next_ready() {
            let mut interpreter = Interpreter::new(
                &mut core.bus,
                &mut *core.store,
                &mut core.supervisor,
                &core.rules,
                core.options.max_steps_per_turn,
            );
            if let TurnEnd::Invoked(call) = interpreter.run_turn(task, resume) {
                calls.push(call);
            }
            continue;
        }

        break;
    }

    let mut commands = Vec::new();
    if !calls.is_empty() {
        commands.push(CoreCommand::DispatchCalls(calls));
    }

    let mut keep_running = true;
    if check_exit && core.idle_exit_due() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
