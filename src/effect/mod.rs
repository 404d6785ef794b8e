// src/effect/mod.rs

//! Effect descriptors and the workflow authoring surface.
//!
//! A workflow is an explicit resumable state machine: the interpreter calls
//! [`Workflow::resume`] with the value injected at the last suspension point
//! and receives either the next [`Effect`] to perform or a completion value.
//! Effects are plain data; nothing happens until the interpreter acts on them.
//!
//! - [`validate`] rejects malformed descriptors before they are interpreted.

pub mod validate;

use std::fmt;

use serde_json::Value;

use crate::bus::Action;
use crate::engine::{Outcome, TaskId};
use crate::errors::WorkflowError;
use crate::state::Selector;

pub use validate::{EffectRules, validate_effect};

/// What a workflow asks the engine to do next.
pub enum Effect<A: Action> {
    /// Call an external asynchronous operation and suspend until it settles.
    Invoke { operation: String, args: Value },
    /// Publish an action. Does not suspend.
    Emit(A),
    /// Read from the state snapshot. Does not suspend.
    ReadState(Selector),
    /// Start a child workflow. Resumes immediately with the child's handle.
    Fork(Box<dyn Workflow<A>>),
    /// Suspend until the referenced instance is terminal.
    Join(TaskId),
    /// Suspend until an action of this kind is published.
    AwaitEvent(A::Kind),
}

impl<A: Action> Effect<A> {
    pub fn invoke(operation: impl Into<String>, args: Value) -> Self {
        Effect::Invoke {
            operation: operation.into(),
            args,
        }
    }

    pub fn emit(action: A) -> Self {
        Effect::Emit(action)
    }

    pub fn read_state(selector: impl Into<Selector>) -> Self {
        Effect::ReadState(selector.into())
    }

    pub fn fork<W: Workflow<A>>(workflow: W) -> Self {
        Effect::Fork(Box::new(workflow))
    }

    pub fn join(task: TaskId) -> Self {
        Effect::Join(task)
    }

    pub fn await_event(kind: A::Kind) -> Self {
        Effect::AwaitEvent(kind)
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Effect::Invoke { .. } => "invoke",
            Effect::Emit(_) => "emit",
            Effect::ReadState(_) => "read_state",
            Effect::Fork(_) => "fork",
            Effect::Join(_) => "join",
            Effect::AwaitEvent(_) => "await_event",
        }
    }

    /// Whether interpreting this effect parks the workflow.
    pub fn suspends(&self) -> bool {
        matches!(
            self,
            Effect::Invoke { .. } | Effect::Join(_) | Effect::AwaitEvent(_)
        )
    }
}

impl<A: Action> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Invoke { operation, args } => f
                .debug_struct("Invoke")
                .field("operation", operation)
                .field("args", args)
                .finish(),
            Effect::Emit(action) => f.debug_tuple("Emit").field(action).finish(),
            Effect::ReadState(selector) => f.debug_tuple("ReadState").field(selector).finish(),
            Effect::Fork(workflow) => f.debug_tuple("Fork").field(&workflow.name()).finish(),
            Effect::Join(task) => f.debug_tuple("Join").field(task).finish(),
            Effect::AwaitEvent(kind) => f.debug_tuple("AwaitEvent").field(kind).finish(),
        }
    }
}

/// Result of advancing a workflow by one step.
#[derive(Debug)]
pub enum Step<A: Action> {
    Yield(Effect<A>),
    Done(Value),
}

/// Value injected into a workflow when it resumes.
#[derive(Debug, Clone)]
pub enum Resume<A: Action> {
    /// First call, before any effect has been yielded.
    Start,
    /// `Invoke` succeeded.
    Value(Value),
    /// `Invoke` failed, or the yielded effect was rejected.
    Failure(WorkflowError),
    /// `Fork` started a child.
    Handle(TaskId),
    /// `Join` target reached a terminal state.
    Joined { task: TaskId, outcome: Outcome },
    /// `AwaitEvent` matched.
    Event(A),
    /// `ReadState` result.
    State(Value),
    /// `Emit` was published.
    Emitted,
}

impl<A: Action> Resume<A> {
    /// Collapse into a plain result so a program can use `?` to propagate
    /// failures or `match` to recover locally.
    ///
    /// Joined outcomes map `Failed` to [`WorkflowError::JoinFailure`] and
    /// `Cancelled` to [`WorkflowError::CancellationAbort`].
    pub fn into_value(self) -> Result<Value, WorkflowError> {
        match self {
            Resume::Start | Resume::Emitted | Resume::Event(_) => Ok(Value::Null),
            Resume::Value(v) | Resume::State(v) => Ok(v),
            Resume::Failure(err) => Err(err),
            Resume::Handle(task) => Ok(Value::from(task.as_u64())),
            Resume::Joined { task, outcome } => outcome.into_result(task),
        }
    }

    pub fn into_handle(self) -> Result<TaskId, WorkflowError> {
        match self {
            Resume::Handle(task) => Ok(task),
            Resume::Failure(err) => Err(err),
            other => Err(unexpected("handle", &other)),
        }
    }

    pub fn into_event(self) -> Result<A, WorkflowError> {
        match self {
            Resume::Event(action) => Ok(action),
            Resume::Failure(err) => Err(err),
            other => Err(unexpected("event", &other)),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Resume::Failure(_))
    }
}

fn unexpected<A: Action>(wanted: &str, got: &Resume<A>) -> WorkflowError {
    WorkflowError::Program(format!("expected {wanted} on resume, got {got:?}"))
}

/// A resumable program.
///
/// `resume` is called once with [`Resume::Start`] and then once per yielded
/// effect with the value for that effect. Returning `Err` is an uncaught
/// failure: the instance becomes `Failed` and its live descendants are
/// cancelled.
pub trait Workflow<A: Action>: Send + 'static {
    fn name(&self) -> &str;

    fn resume(&mut self, input: Resume<A>) -> Result<Step<A>, WorkflowError>;
}

/// Workflow built from a closure.
///
/// The closure keeps its own continuation state in captured variables:
///
/// ```ignore
/// let mut stage = 0;
/// let wf = workflow_fn("ping-twice", move |input| {
///     stage += 1;
///     match stage {
///         1 => Ok(Step::Yield(Effect::emit(Ping::Tick(1)))),
///         2 => Ok(Step::Yield(Effect::emit(Ping::Tick(2)))),
///         _ => Ok(Step::Done(input.into_value()?)),
///     }
/// });
/// ```
pub struct FnWorkflow<F> {
    name: String,
    body: F,
}

pub fn workflow_fn<A, F>(name: impl Into<String>, body: F) -> FnWorkflow<F>
where
    A: Action,
    F: FnMut(Resume<A>) -> Result<Step<A>, WorkflowError> + Send + 'static,
{
    FnWorkflow {
        name: name.into(),
        body,
    }
}

impl<A, F> Workflow<A> for FnWorkflow<F>
where
    A: Action,
    F: FnMut(Resume<A>) -> Result<Step<A>, WorkflowError> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, input: Resume<A>) -> Result<Step<A>, WorkflowError> {
        (self.body)(input)
    }
}
