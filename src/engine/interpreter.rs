// src/engine/interpreter.rs

//! Advances one workflow instance per turn.
//!
//! A turn starts with the value injected at the instance's last suspension
//! point and keeps interpreting effects until the program yields one that
//! suspends (`Invoke`, `Join` on a live target, `AwaitEvent`), completes, or
//! fails. `Emit`, `ReadState` and `Fork` never end a turn.

use tracing::{debug, trace, warn};

use crate::bus::{Action, ActionBus};
use crate::effect::{Effect, EffectRules, Resume, Step, Workflow, validate_effect};
use crate::engine::supervisor::{CancelReport, JoinStatus, Supervisor};
use crate::engine::task_info::{Pending, ScheduledCall, TaskState};
use crate::engine::{Outcome, TaskId};
use crate::errors::WorkflowError;
use crate::state::Store;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEnd {
    /// The instance was unknown or already terminal; nothing ran.
    Skipped,
    /// Parked on `Join` or `AwaitEvent`.
    Suspended,
    /// Parked on an operation call the backend must perform.
    Invoked(ScheduledCall),
    /// Reached a terminal state during this turn.
    Retired(TaskState),
}

/// Borrowed view over the core's parts for the duration of one turn.
pub struct Interpreter<'a, A: Action> {
    bus: &'a mut ActionBus<A>,
    store: &'a mut dyn Store<A>,
    supervisor: &'a mut Supervisor<A>,
    rules: &'a EffectRules,
    max_steps: usize,
}

impl<'a, A: Action> Interpreter<'a, A> {
    pub fn new(
        bus: &'a mut ActionBus<A>,
        store: &'a mut dyn Store<A>,
        supervisor: &'a mut Supervisor<A>,
        rules: &'a EffectRules,
        max_steps: usize,
    ) -> Self {
        Self {
            bus,
            store,
            supervisor,
            rules,
            max_steps,
        }
    }

    /// Run one turn of `task`, starting with `resume`.
    pub fn run_turn(&mut self, task: TaskId, resume: Resume<A>) -> TurnEnd {
        let Some(mut program) = self.supervisor.begin_turn(task) else {
            debug!(%task, "turn skipped; instance not runnable");
            return TurnEnd::Skipped;
        };

        let mut input = resume;
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > self.max_steps {
                let err = WorkflowError::StepLimitExceeded {
                    limit: self.max_steps,
                };
                return self.retire(task, Outcome::Failed(err));
            }

            let effect = match program.resume(input) {
                Ok(Step::Yield(effect)) => effect,
                Ok(Step::Done(value)) => {
                    return self.retire(task, Outcome::Completed(value));
                }
                Err(err) => {
                    warn!(%task, error = %err, "uncaught workflow failure");
                    return self.retire(task, Outcome::Failed(err));
                }
            };

            trace!(%task, effect = effect.label(), "interpreting effect");

            if let Err(err) = validate_effect(&effect, task, self.rules) {
                debug!(%task, error = %err, "effect rejected");
                input = Resume::Failure(err);
                continue;
            }

            input = match effect {
                Effect::Emit(action) => {
                    debug!(%task, kind = %action.kind(), "emit");
                    self.store.reduce(&action);
                    self.bus.publish(action);
                    Resume::Emitted
                }
                Effect::ReadState(selector) => match self.store.select(&selector) {
                    Some(value) => Resume::State(value),
                    None => Resume::Failure(WorkflowError::InvalidEffect(format!(
                        "unknown state selector '{selector}'"
                    ))),
                },
                Effect::Fork(child) => {
                    let handle = self.supervisor.fork(task, child);
                    debug!(%task, child = %handle, "forked child workflow");
                    Resume::Handle(handle)
                }
                Effect::Invoke { operation, args } => {
                    let call = self.supervisor.begin_call(task, operation, args);
                    debug!(%task, call = %call.call, operation = %call.operation, "invoke");
                    self.park(task, program, Pending::Call(call.call));
                    return TurnEnd::Invoked(call);
                }
                Effect::Join(target) => match self.supervisor.add_joiner(target, task) {
                    Ok(JoinStatus::Terminal(outcome)) => {
                        debug!(%task, %target, "join on terminal instance; resuming now");
                        Resume::Joined {
                            task: target,
                            outcome,
                        }
                    }
                    Ok(JoinStatus::Registered) => {
                        debug!(%task, %target, "join registered");
                        self.park(task, program, Pending::Join(target));
                        return TurnEnd::Suspended;
                    }
                    Err(err) => Resume::Failure(err),
                },
                Effect::AwaitEvent(kind) => {
                    let subscription = self.bus.subscribe_once(kind, task);
                    debug!(%task, %kind, %subscription, "awaiting event");
                    self.park(task, program, Pending::Event { kind, subscription });
                    return TurnEnd::Suspended;
                }
            };
        }
    }

    fn park(&mut self, task: TaskId, program: Box<dyn Workflow<A>>, pending: Pending<A::Kind>) {
        self.supervisor.park(task, program, pending);
    }

    fn retire(&mut self, task: TaskId, outcome: Outcome) -> TurnEnd {
        let state = TaskState::for_outcome(&outcome);
        let report = self.supervisor.retire(task, outcome);
        drop_subscriptions(self.bus, &report);
        TurnEnd::Retired(state)
    }
}

/// Remove the one-shot subscriptions of instances cancelled by a cascade.
pub(crate) fn drop_subscriptions<A: Action>(bus: &mut ActionBus<A>, report: &CancelReport) {
    for subscription in &report.dropped_subscriptions {
        bus.unsubscribe(*subscription);
    }
}
