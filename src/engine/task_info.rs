// src/engine/task_info.rs

//! Workflow instance records and call descriptions.

use serde_json::Value;

use crate::bus::{Action, SubscriptionId};
use crate::effect::Workflow;
use crate::engine::{CallId, Outcome, TaskId};

/// Lifecycle state of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting to run, or parked at a suspension point.
    Suspended,
    /// Currently being interpreted.
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }

    pub(crate) fn for_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Completed(_) => TaskState::Completed,
            Outcome::Failed(_) => TaskState::Failed,
            Outcome::Cancelled => TaskState::Cancelled,
        }
    }
}

/// Why a suspended instance is parked (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending<K> {
    /// Awaiting an external operation.
    Call(CallId),
    /// Registered as a joiner of another instance.
    Join(TaskId),
    /// One-shot bus subscription.
    Event { kind: K, subscription: SubscriptionId },
}

/// Instance record owned by the supervisor (internal).
pub(crate) struct TaskInfo<A: Action> {
    pub name: String,
    /// `None` while the interpreter holds it, and after retirement.
    pub program: Option<Box<dyn Workflow<A>>>,
    pub state: TaskState,
    pub parent: Option<TaskId>,
    pub children: Vec<TaskId>,
    pub pending: Option<Pending<A::Kind>>,
    /// Instances parked on `Join` of this one, in registration order.
    pub joiners: Vec<TaskId>,
    pub outcome: Option<Outcome>,
}

impl<A: Action> TaskInfo<A> {
    pub fn new(program: Box<dyn Workflow<A>>, parent: Option<TaskId>) -> Self {
        Self {
            name: program.name().to_string(),
            program: Some(program),
            state: TaskState::Suspended,
            parent,
            children: Vec::new(),
            pending: None,
            joiners: Vec::new(),
            outcome: None,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.state.is_terminal()
    }
}

/// Description of an operation call the core wants the backend to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCall {
    pub call: CallId,
    /// Instance parked on this call.
    pub task: TaskId,
    pub operation: String,
    pub args: Value,
}
