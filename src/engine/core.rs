// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledCall`s to the operation backend
//! - handling Ctrl+C / shutdown
//!
//! Exactly one interpretation step runs at a time: every turn happens inside
//! [`CoreRuntime::step`], so concurrency between workflows is interleaving
//! at suspension points, never parallel execution. The core is unit tested
//! without any Tokio, channels or network.

use serde_json::Value;

use crate::bus::{Action, ActionBus, SubscriptionId};
use crate::effect::{EffectRules, Workflow};
use crate::engine::event_handlers::{self, CoreStep, drain};
use crate::engine::interpreter::drop_subscriptions;
use crate::engine::registrar::Registrar;
use crate::engine::supervisor::{CancelReport, Supervisor};
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskId};
use crate::errors::Result;
use crate::state::{Selector, Store};
use crate::types::LaunchMode;

/// Pure core runtime state.
///
/// This owns:
/// - the action bus
/// - the state store (reducer collaborator)
/// - the task supervisor
/// - the dispatch registrar
/// - effect validation rules and runtime options
///
/// It has **no** channels, no Tokio types, and does not perform any IO. One
/// value is one independent engine; nothing is global.
pub struct CoreRuntime<A: Action> {
    pub(crate) bus: ActionBus<A>,
    pub(crate) store: Box<dyn Store<A>>,
    pub(crate) supervisor: Supervisor<A>,
    pub(crate) registrar: Registrar<A>,
    pub(crate) rules: EffectRules,
    pub(crate) options: RuntimeOptions,
}

impl<A: Action> CoreRuntime<A> {
    pub fn new<S: Store<A>>(store: S, options: RuntimeOptions) -> Self {
        Self {
            bus: ActionBus::new(),
            store: Box::new(store),
            supervisor: Supervisor::new(options.max_retained_outcomes),
            registrar: Registrar::new(),
            rules: EffectRules::default(),
            options,
        }
    }

    /// Replace the effect validation rules.
    pub fn with_rules(mut self, rules: EffectRules) -> Self {
        self.rules = rules;
        self
    }

    /// Register a dispatch policy. Policies are fixed once the core is moved
    /// into a [`Runtime`](crate::engine::Runtime).
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        kind: A::Kind,
        mode: LaunchMode,
        factory: F,
    ) -> Result<()>
    where
        F: Fn(&A) -> Box<dyn Workflow<A>> + Send + 'static,
    {
        self.registrar.register(name, kind, mode, factory)
    }

    /// Subscribe an external handler to one action kind.
    pub fn subscribe<F>(&mut self, kind: A::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&A) + Send + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    /// Subscribe an external handler to every action.
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&A) + Send + 'static,
    {
        self.bus.subscribe_all(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Start a root workflow directly, outside any dispatch policy. It runs
    /// on the next [`step`](Self::step) or [`pump`](Self::pump).
    pub fn spawn_root<W: Workflow<A>>(&mut self, workflow: W) -> TaskId {
        self.supervisor.spawn_root(Box::new(workflow))
    }

    /// Cancel an instance and its live descendants.
    pub fn cancel(&mut self, task: TaskId) -> CancelReport {
        let report = self.supervisor.cancel(task);
        drop_subscriptions(&mut self.bus, &report);
        report
    }

    pub fn supervisor(&self) -> &Supervisor<A> {
        &self.supervisor
    }

    pub fn registrar(&self) -> &Registrar<A> {
        &self.registrar
    }

    pub fn bus(&self) -> &ActionBus<A> {
        &self.bus
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Read from the current state snapshot, as `ReadState` would.
    pub fn select(&self, selector: impl Into<Selector>) -> Option<Value> {
        self.store.select(&selector.into())
    }

    /// Returns `true` if no workflow instance is live.
    pub fn is_idle(&self) -> bool {
        self.supervisor.is_idle()
    }

    /// No queued action, no ready instance and no call in flight: nothing
    /// can happen until a new action is published.
    pub fn is_quiescent(&self) -> bool {
        !self.bus.has_pending()
            && !self.supervisor.has_ready()
            && self.supervisor.calls_in_flight() == 0
    }

    /// `exit_when_idle` is set and the core is quiescent.
    pub fn idle_exit_due(&self) -> bool {
        self.options.exit_when_idle && self.is_quiescent()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent<A>) -> CoreStep {
        match event {
            RuntimeEvent::Publish(action) => event_handlers::handle_publish(self, action),
            RuntimeEvent::OperationSettled { call, result } => {
                event_handlers::handle_settlement(self, call, result)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    /// Run pending work (for example roots started with
    /// [`spawn_root`](Self::spawn_root)) without feeding a new event.
    ///
    /// Never requests exit, even in `exit_when_idle` mode.
    pub fn pump(&mut self) -> CoreStep {
        drain(self, false)
    }
}

impl<A: Action> std::fmt::Debug for CoreRuntime<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreRuntime")
            .field("bus", &self.bus)
            .field("supervisor", &self.supervisor)
            .field("policies", &self.registrar.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{Map, json};

    use super::*;
    use crate::effect::{Effect, Resume, Step, workflow_fn};
    use crate::engine::{CoreCommand, Outcome, TaskState};
    use crate::errors::{OperationError, WorkflowError};
    use crate::state::{JsonStore, NoState};
    use crate::test_support::{Ping, PingKind};

    fn core() -> CoreRuntime<Ping> {
        CoreRuntime::new(NoState, RuntimeOptions::default())
    }

    fn only_call(step: &CoreStep) -> crate::engine::ScheduledCall {
        let calls: Vec<_> = step.calls().cloned().collect();
        assert_eq!(calls.len(), 1, "expected exactly one call, got {calls:?}");
        calls.into_iter().next().unwrap()
    }

    /// Invokes `op` once and completes with its result.
    fn invoke_then_finish(op: &'static str) -> impl Workflow<Ping> {
        let mut stage = 0;
        workflow_fn(op, move |input: Resume<Ping>| {
            stage += 1;
            match stage {
                1 => Ok(Step::Yield(Effect::invoke(op, json!(null)))),
                _ => Ok(Step::Done(input.into_value()?)),
            }
        })
    }

    #[test]
    fn latest_policy_cancels_before_first_turn_and_never_resumes_it() {
        let mut core = core();
        core.register("ticks", PingKind::Tick, LaunchMode::Latest, |_| {
            Box::new(invoke_then_finish("slow")) as Box<dyn Workflow<Ping>>
        })
        .unwrap();

        // Both actions are queued before any dispatch happens.
        core.bus.publish(Ping::Tick(1));
        core.bus.publish(Ping::Tick(2));
        let step = core.pump();

        let call = only_call(&step);
        let first = TaskId::from_raw(1);
        let second = TaskId::from_raw(2);
        assert_eq!(call.task, second);
        assert_eq!(core.supervisor().state_of(first), Some(TaskState::Cancelled));
    }

    #[test]
    fn late_settlement_of_cancelled_instance_is_discarded() {
        let mut core = core();
        core.register("ticks", PingKind::Tick, LaunchMode::Latest, |_| {
            Box::new(invoke_then_finish("slow")) as Box<dyn Workflow<Ping>>
        })
        .unwrap();

        let first_call = only_call(&core.step(RuntimeEvent::Publish(Ping::Tick(1))));
        let second_call = only_call(&core.step(RuntimeEvent::Publish(Ping::Tick(2))));

        let step = core.step(RuntimeEvent::OperationSettled {
            call: first_call.call,
            result: Ok(json!("stale")),
        });
        assert!(step.commands.is_empty());
        assert_eq!(
            core.supervisor().outcome_of(first_call.task),
            Some(&Outcome::Cancelled)
        );

        core.step(RuntimeEvent::OperationSettled {
            call: second_call.call,
            result: Ok(json!("fresh")),
        });
        assert_eq!(
            core.supervisor().outcome_of(second_call.task),
            Some(&Outcome::Completed(json!("fresh")))
        );
    }

    #[test]
    fn caught_invoke_failure_completes_uncaught_one_fails() {
        let mut core = core();

        let mut stage = 0;
        let catching = core.spawn_root(workflow_fn("catching", move |input: Resume<Ping>| {
            stage += 1;
            match stage {
                1 => Ok(Step::Yield(Effect::invoke("flaky", json!(null)))),
                2 => match input.into_value() {
                    Ok(v) => Ok(Step::Done(v)),
                    Err(_) => Ok(Step::Yield(Effect::emit(Ping::Note("failed".into())))),
                },
                _ => Ok(Step::Done(json!("handled"))),
            }
        }));
        let uncaught = core.spawn_root(invoke_then_finish("flaky"));

        let step = core.pump();
        let calls: Vec<_> = step.calls().cloned().collect();
        assert_eq!(calls.len(), 2);

        for call in calls {
            core.step(RuntimeEvent::OperationSettled {
                call: call.call,
                result: Err(OperationError::Rejected("503".into())),
            });
        }

        assert_eq!(
            core.supervisor().outcome_of(catching),
            Some(&Outcome::Completed(json!("handled")))
        );
        assert!(matches!(
            core.supervisor().outcome_of(uncaught),
            Some(Outcome::Failed(WorkflowError::OperationFailure { operation, .. })) if operation == "flaky"
        ));
    }

    #[test]
    fn fork_join_completes_after_both_children_regardless_of_order() {
        let mut core = core();

        let mut stage = 0;
        let mut handles = Vec::new();
        let mut results = Vec::new();
        let parent = core.spawn_root(workflow_fn("parent", move |input: Resume<Ping>| {
            stage += 1;
            match stage {
                1 => Ok(Step::Yield(Effect::fork(invoke_then_finish("a")))),
                2 => {
                    handles.push(input.into_handle()?);
                    Ok(Step::Yield(Effect::fork(invoke_then_finish("b"))))
                }
                3 => {
                    handles.push(input.into_handle()?);
                    Ok(Step::Yield(Effect::join(handles[0])))
                }
                4 => {
                    results.push(input.into_value()?);
                    Ok(Step::Yield(Effect::join(handles[1])))
                }
                _ => {
                    results.push(input.into_value()?);
                    Ok(Step::Done(json!(results)))
                }
            }
        }));

        let step = core.pump();
        let calls: Vec<_> = step.calls().cloned().collect();
        assert_eq!(calls.len(), 2);
        let (a, b) = (&calls[0], &calls[1]);
        assert_eq!((a.operation.as_str(), b.operation.as_str()), ("a", "b"));

        // Second child settles first.
        core.step(RuntimeEvent::OperationSettled { call: b.call, result: Ok(json!("B")) });
        assert_eq!(core.supervisor().state_of(parent), Some(TaskState::Suspended));

        core.step(RuntimeEvent::OperationSettled { call: a.call, result: Ok(json!("A")) });
        assert_eq!(
            core.supervisor().outcome_of(parent),
            Some(&Outcome::Completed(json!(["A", "B"])))
        );
    }

    #[test]
    fn cancelling_parent_cancels_forked_children_first() {
        let mut core = core();
        let mut stage = 0;
        let parent = core.spawn_root(workflow_fn("parent", move |input: Resume<Ping>| {
            stage += 1;
            match stage {
                1 => Ok(Step::Yield(Effect::fork(invoke_then_finish("child")))),
                _ => {
                    let child = input.into_handle()?;
                    Ok(Step::Yield(Effect::join(child)))
                }
            }
        }));
        core.pump();
        let child = core.supervisor().children_of(parent)[0];

        let report = core.cancel(parent);

        assert_eq!(report.cancelled, vec![child, parent]);
        assert_eq!(report.abandoned_calls.len(), 1);
        assert_eq!(core.supervisor().state_of(child), Some(TaskState::Cancelled));
        assert_eq!(core.supervisor().state_of(parent), Some(TaskState::Cancelled));
    }

    #[test]
    fn await_event_resumes_with_the_published_action() {
        let mut core = core();
        let mut stage = 0;
        let waiter = core.spawn_root(workflow_fn("waiter", move |input: Resume<Ping>| {
            stage += 1;
            match stage {
                1 => Ok(Step::Yield(Effect::await_event(PingKind::Note))),
                _ => match input.into_event()? {
                    Ping::Note(text) => Ok(Step::Done(json!(text))),
                    other => Err(WorkflowError::Program(format!("unexpected {other:?}"))),
                },
            }
        }));
        core.pump();

        core.step(RuntimeEvent::Publish(Ping::Tick(1)));
        assert_eq!(core.supervisor().state_of(waiter), Some(TaskState::Suspended));

        core.step(RuntimeEvent::Publish(Ping::Note("hello".into())));
        assert_eq!(
            core.supervisor().outcome_of(waiter),
            Some(&Outcome::Completed(json!("hello")))
        );
    }

    #[test]
    fn read_state_observes_action_emitted_earlier_in_the_turn() {
        let mut initial = Map::new();
        initial.insert("ticks".into(), json!(0));
        let store = JsonStore::new(initial, |state, a: &Ping| {
            if matches!(a, Ping::Tick(_)) {
                let n = state["ticks"].as_u64().unwrap_or(0) + 1;
                state.insert("ticks".into(), json!(n));
            }
        });
        let mut core = CoreRuntime::new(store, RuntimeOptions::default());

        let mut stage = 0;
        let task = core.spawn_root(workflow_fn("counter", move |input: Resume<Ping>| {
            stage += 1;
            match stage {
                1 => Ok(Step::Yield(Effect::emit(Ping::Tick(1)))),
                2 => Ok(Step::Yield(Effect::read_state("ticks"))),
                _ => Ok(Step::Done(input.into_value()?)),
            }
        }));
        core.pump();

        assert_eq!(
            core.supervisor().outcome_of(task),
            Some(&Outcome::Completed(json!(1)))
        );
    }

    #[test]
    fn handlers_see_emitted_actions_in_emission_order() {
        let mut core = core();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        core.subscribe_all(move |a| sink.lock().unwrap().push(a.clone()));

        let mut n = 0;
        core.spawn_root(workflow_fn("burst", move |_input: Resume<Ping>| {
            n += 1;
            if n <= 3 {
                Ok(Step::Yield(Effect::emit(Ping::Tick(n))))
            } else {
                Ok(Step::Done(json!(null)))
            }
        }));
        core.pump();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Ping::Tick(1), Ping::Tick(2), Ping::Tick(3)]
        );
    }

    #[test]
    fn exit_requested_only_when_quiescent() {
        let options = RuntimeOptions {
            exit_when_idle: true,
            ..RuntimeOptions::default()
        };
        let mut core = CoreRuntime::new(NoState, options);
        core.register("ticks", PingKind::Tick, LaunchMode::Every, |_| {
            Box::new(invoke_then_finish("op")) as Box<dyn Workflow<Ping>>
        })
        .unwrap();

        let step = core.step(RuntimeEvent::Publish(Ping::Tick(1)));
        assert!(step.keep_running);
        let call = only_call(&step);

        let step = core.step(RuntimeEvent::OperationSettled {
            call: call.call,
            result: Ok(json!(1)),
        });
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = core();
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
    }
}
