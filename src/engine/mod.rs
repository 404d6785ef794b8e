// src/engine/mod.rs

//! Orchestration engine for sagaflow.
//!
//! This module ties together:
//! - the task supervisor (instance table, fork/join/cancel bookkeeping)
//! - the interpreter that advances one workflow instance per turn
//! - the dispatch registrar (which actions launch which workflows)
//! - the main runtime event loop that reacts to:
//!   - actions published by external actors
//!   - settlements of external operations
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;

use serde_json::Value;

use crate::errors::{OperationError, WorkflowError};

/// Handle of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Identifier of one in-flight external operation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Terminal result of a workflow instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Value),
    Failed(WorkflowError),
    Cancelled,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Convert into what a joiner of `task` observes.
    pub fn into_result(self, task: TaskId) -> Result<Value, WorkflowError> {
        match self {
            Outcome::Completed(v) => Ok(v),
            Outcome::Failed(err) => Err(WorkflowError::JoinFailure {
                task,
                message: err.to_string(),
            }),
            Outcome::Cancelled => Err(WorkflowError::CancellationAbort { task }),
        }
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit once no action is queued, no instance is ready and no
    /// operation call is in flight (used for `--once`).
    pub exit_when_idle: bool,
    /// Upper bound on effects interpreted for one instance in a single turn
    /// without reaching a suspension point.
    pub max_steps_per_turn: usize,
    /// How many terminal instance records to keep for late joins.
    pub max_retained_outcomes: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_idle: false,
            max_steps_per_turn: 1024,
            max_retained_outcomes: 1024,
        }
    }
}

/// Events flowing into the runtime from external actors and operations.
#[derive(Debug, Clone)]
pub enum RuntimeEvent<A> {
    /// Publish an action on the bus.
    Publish(A),
    /// An external operation finished.
    OperationSettled {
        call: CallId,
        result: Result<Value, OperationError>,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod handle;
pub mod interpreter;
pub mod registrar;
pub mod runtime;
pub mod supervisor;
pub mod task_info;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use handle::EngineHandle;
pub use registrar::{DispatchPolicy, Registrar, WorkflowFactory};
pub use runtime::Runtime;
pub use supervisor::Supervisor;
pub use task_info::{ScheduledCall, TaskState};
pub use crate::types::LaunchMode;
