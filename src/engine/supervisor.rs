// src/engine/supervisor.rs

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bus::{Action, SubscriptionId};
use crate::effect::{Resume, Workflow};
use crate::engine::task_info::{Pending, ScheduledCall, TaskInfo, TaskState};
use crate::engine::{CallId, Outcome, TaskId};
use crate::errors::WorkflowError;

/// Bookkeeping the caller must apply after a cancellation cascade.
///
/// The supervisor does not own the bus, so dropped one-shot subscriptions
/// are handed back for the caller to unsubscribe.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CancelReport {
    /// Instances moved to `Cancelled`, descendants before ancestors.
    pub cancelled: Vec<TaskId>,
    /// Calls whose eventual results will be discarded.
    pub abandoned_calls: Vec<CallId>,
    pub dropped_subscriptions: Vec<SubscriptionId>,
}

impl CancelReport {
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty()
    }

    pub fn merge(&mut self, other: CancelReport) {
        self.cancelled.extend(other.cancelled);
        self.abandoned_calls.extend(other.abandoned_calls);
        self.dropped_subscriptions.extend(other.dropped_subscriptions);
    }
}

/// Result of registering a joiner.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinStatus {
    /// Target already terminal; resume immediately with its stored outcome.
    Terminal(Outcome),
    /// Joiner parked until the target retires.
    Registered,
}

/// Owns every workflow instance, roots and forked children alike.
///
/// It is responsible for:
/// - allocating task handles and recording parent/child ownership
/// - the FIFO ready queue of instances waiting for their next turn
/// - mapping in-flight calls back to the instance parked on them
/// - join registration and wake-up in registration order
/// - cascading cancellation through the descendant tree
/// - retaining terminal outcomes (bounded) so late joins see them
pub struct Supervisor<A: Action> {
    tasks: HashMap<TaskId, TaskInfo<A>>,
    ready: VecDeque<(TaskId, Resume<A>)>,
    /// In-flight calls: call -> (parked task, operation name).
    calls: HashMap<CallId, (TaskId, String)>,
    /// Terminal instances in retirement order, oldest first.
    retired: VecDeque<TaskId>,
    max_retained: usize,
    next_task: u64,
    next_call: u64,
}

impl<A: Action> Supervisor<A> {
    pub fn new(max_retained: usize) -> Self {
        Self {
            tasks: HashMap::new(),
            ready: VecDeque::new(),
            calls: HashMap::new(),
            retired: VecDeque::new(),
            max_retained,
            next_task: 0,
            next_call: 0,
        }
    }

    /// Register a root instance and queue its first turn.
    pub fn spawn_root(&mut self, program: Box<dyn Workflow<A>>) -> TaskId {
        self.insert(program, None)
    }

    /// Register a child of `parent` and queue its first turn.
    pub fn fork(&mut self, parent: TaskId, program: Box<dyn Workflow<A>>) -> TaskId {
        let child = self.insert(program, Some(parent));
        if let Some(info) = self.tasks.get_mut(&parent) {
            info.children.push(child);
        } else {
            warn!(%parent, %child, "fork from unknown parent; child recorded without owner");
        }
        child
    }

    pub fn state_of(&self, task: TaskId) -> Option<TaskState> {
        self.tasks.get(&task).map(|info| info.state)
    }

    pub fn outcome_of(&self, task: TaskId) -> Option<&Outcome> {
        self.tasks.get(&task)?.outcome.as_ref()
    }

    pub fn name_of(&self, task: TaskId) -> Option<&str> {
        self.tasks.get(&task).map(|info| info.name.as_str())
    }

    pub fn parent_of(&self, task: TaskId) -> Option<TaskId> {
        self.tasks.get(&task)?.parent
    }

    pub fn children_of(&self, task: TaskId) -> &[TaskId] {
        self.tasks
            .get(&task)
            .map(|info| info.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of instances that are not terminal.
    pub fn live_count(&self) -> usize {
        self.tasks.values().filter(|info| info.is_live()).count()
    }

    /// Returns `true` if no instance is live.
    pub fn is_idle(&self) -> bool {
        self.live_count() == 0
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn calls_in_flight(&self) -> usize {
        self.calls.len()
    }

    /// Whether `task` or any of its descendants is still live.
    pub fn has_live_tree(&self, task: TaskId) -> bool {
        match self.tasks.get(&task) {
            Some(info) => info.is_live() || self.has_live_descendants(task),
            None => false,
        }
    }

    /// Pop the next instance due for a turn, skipping entries whose instance
    /// became terminal after it was queued.
    pub(crate) fn next_ready(&mut self) -> Option<(TaskId, Resume<A>)> {
        while let Some((task, resume)) = self.ready.pop_front() {
            match self.tasks.get(&task) {
                Some(info) if info.is_live() => return Some((task, resume)),
                _ => debug!(%task, "dropping ready entry for terminal instance"),
            }
        }
        None
    }

    /// Take the program out for a turn and mark the instance `Running`.
    ///
    /// Returns `None` if the instance is unknown or terminal.
    pub(crate) fn begin_turn(&mut self, task: TaskId) -> Option<Box<dyn Workflow<A>>> {
        let info = self.tasks.get_mut(&task)?;
        if !info.is_live() {
            return None;
        }
        info.state = TaskState::Running;
        info.pending = None;
        info.program.take()
    }

    /// Hand the program back after a turn that ended at a suspension point.
    pub(crate) fn park(
        &mut self,
        task: TaskId,
        program: Box<dyn Workflow<A>>,
        pending: Pending<A::Kind>,
    ) {
        if let Some(info) = self.tasks.get_mut(&task) {
            if info.is_live() {
                info.state = TaskState::Suspended;
                info.program = Some(program);
                info.pending = Some(pending);
            }
        }
    }

    /// Allocate a call id for an `Invoke` yielded by `task`.
    pub(crate) fn begin_call(&mut self, task: TaskId, operation: String, args: Value) -> ScheduledCall {
        self.next_call += 1;
        let call = CallId::from_raw(self.next_call);
        self.calls.insert(call, (task, operation.clone()));
        ScheduledCall {
            call,
            task,
            operation,
            args,
        }
    }

    /// Resolve a settled call to the instance still parked on it.
    ///
    /// Returns `None` for abandoned calls (the instance was cancelled) so the
    /// result is discarded instead of resuming a terminal instance.
    pub(crate) fn settle_call(&mut self, call: CallId) -> Option<(TaskId, String)> {
        let (task, operation) = self.calls.remove(&call)?;
        let info = self.tasks.get_mut(&task)?;
        if info.is_live() && info.pending == Some(Pending::Call(call)) {
            info.pending = None;
            Some((task, operation))
        } else {
            None
        }
    }

    /// Register `joiner` on `target`.
    pub(crate) fn add_joiner(
        &mut self,
        target: TaskId,
        joiner: TaskId,
    ) -> Result<JoinStatus, WorkflowError> {
        let Some(info) = self.tasks.get_mut(&target) else {
            return Err(WorkflowError::InvalidEffect(format!(
                "join on unknown or evicted {target}"
            )));
        };
        if let Some(outcome) = &info.outcome {
            return Ok(JoinStatus::Terminal(outcome.clone()));
        }
        info.joiners.push(joiner);
        Ok(JoinStatus::Registered)
    }

    /// Wake an instance parked on `AwaitEvent`.
    pub(crate) fn wake_waiter(&mut self, task: TaskId, action: A) -> bool {
        let Some(info) = self.tasks.get_mut(&task) else {
            return false;
        };
        if !info.is_live() || !matches!(info.pending, Some(Pending::Event { .. })) {
            return false;
        }
        info.pending = None;
        self.ready.push_back((task, Resume::Event(action)));
        true
    }

    /// Resume an instance with a value (used for operation settlement).
    pub(crate) fn make_ready(&mut self, task: TaskId, resume: Resume<A>) {
        self.ready.push_back((task, resume));
    }

    /// Cancel `task` and every live descendant.
    ///
    /// Descendants are cancelled before their ancestors. A terminal `task`
    /// keeps its own outcome, but its live descendants are still cancelled.
    pub fn cancel(&mut self, task: TaskId) -> CancelReport {
        let mut report = CancelReport::default();
        if !self.tasks.contains_key(&task) {
            warn!(%task, "cancel requested for unknown instance; ignoring");
            return report;
        }
        self.cancel_tree(task, &mut report);
        if !report.is_empty() {
            info!(
                %task,
                cancelled = report.cancelled.len(),
                abandoned_calls = report.abandoned_calls.len(),
                "cancellation cascade finished"
            );
        }
        report
    }

    /// Move `task` into its terminal state and wake its joiners.
    ///
    /// A `Failed` outcome first cancels every live descendant.
    pub fn retire(&mut self, task: TaskId, outcome: Outcome) -> CancelReport {
        let mut report = CancelReport::default();
        if matches!(outcome, Outcome::Failed(_)) {
            for child in self.children_of(task).to_vec() {
                self.cancel_tree(child, &mut report);
            }
        }
        self.finish(task, outcome);
        report
    }

    fn insert(&mut self, program: Box<dyn Workflow<A>>, parent: Option<TaskId>) -> TaskId {
        self.next_task += 1;
        let id = TaskId::from_raw(self.next_task);
        let info = TaskInfo::new(program, parent);
        debug!(task = %id, name = %info.name, parent = ?parent, "workflow instance registered");
        self.tasks.insert(id, info);
        self.ready.push_back((id, Resume::Start));
        id
    }

    fn has_live_descendants(&self, task: TaskId) -> bool {
        self.children_of(task)
            .iter()
            .any(|child| self.has_live_tree(*child))
    }

    fn cancel_tree(&mut self, task: TaskId, report: &mut CancelReport) {
        for child in self.children_of(task).to_vec() {
            self.cancel_tree(child, report);
        }
        let live = self.tasks.get(&task).is_some_and(|info| info.is_live());
        if live {
            self.cancel_one(task, report);
        }
    }

    fn cancel_one(&mut self, task: TaskId, report: &mut CancelReport) {
        let pending = self.tasks.get_mut(&task).and_then(|info| info.pending.take());

        match pending {
            Some(Pending::Call(call)) => {
                self.calls.remove(&call);
                debug!(%task, %call, "abandoning in-flight call");
                report.abandoned_calls.push(call);
            }
            Some(Pending::Event { kind, subscription }) => {
                debug!(%task, %kind, %subscription, "dropping event subscription");
                report.dropped_subscriptions.push(subscription);
            }
            Some(Pending::Join(target)) => {
                if let Some(target_info) = self.tasks.get_mut(&target) {
                    target_info.joiners.retain(|j| *j != task);
                }
            }
            None => {}
        }

        report.cancelled.push(task);
        self.finish(task, Outcome::Cancelled);
    }

    fn finish(&mut self, task: TaskId, outcome: Outcome) {
        let Some(info) = self.tasks.get_mut(&task) else {
            warn!(%task, "retire called for unknown instance; ignoring");
            return;
        };
        if !info.is_live() {
            debug!(%task, "instance already terminal; ignoring retire");
            return;
        }

        info.state = TaskState::for_outcome(&outcome);
        info.program = None;
        info.pending = None;
        info.outcome = Some(outcome.clone());
        let joiners = std::mem::take(&mut info.joiners);

        match &outcome {
            Outcome::Completed(_) => info!(%task, name = %info.name, "workflow completed"),
            Outcome::Failed(err) => warn!(%task, name = %info.name, error = %err, "workflow failed"),
            Outcome::Cancelled => info!(%task, name = %info.name, "workflow cancelled"),
        }

        for joiner in joiners {
            if let Some(j) = self.tasks.get_mut(&joiner) {
                if j.is_live() && j.pending == Some(Pending::Join(task)) {
                    j.pending = None;
                    self.ready.push_back((
                        joiner,
                        Resume::Joined {
                            task,
                            outcome: outcome.clone(),
                        },
                    ));
                }
            }
        }

        self.retired.push_back(task);
        self.evict_retired();
    }

    /// A terminal record may be dropped once nothing live can still join it
    /// through the tree: its parent is gone or terminal, and it has no live
    /// descendants.
    fn is_evictable(&self, task: TaskId) -> bool {
        let parent_live = self
            .parent_of(task)
            .and_then(|p| self.tasks.get(&p))
            .is_some_and(TaskInfo::is_live);
        !parent_live && !self.has_live_descendants(task)
    }

    /// Drop the oldest terminal records beyond `max_retained`, skipping any
    /// still owned by a live parent or with live descendants.
    fn evict_retired(&mut self) {
        while self.retired.len() > self.max_retained {
            let Some(pos) = self.retired.iter().position(|id| self.is_evictable(*id)) else {
                break;
            };
            let Some(id) = self.retired.remove(pos) else {
                break;
            };
            if let Some(info) = self.tasks.remove(&id) {
                if let Some(parent) = info.parent.and_then(|p| self.tasks.get_mut(&p)) {
                    parent.children.retain(|c| *c != id);
                }
                debug!(task = %id, "evicted terminal instance record");
            }
        }
    }
}

impl<A: Action> fmt::Debug for Supervisor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("instances", &self.tasks.len())
            .field("live", &self.live_count())
            .field("ready", &self.ready.len())
            .field("calls_in_flight", &self.calls.len())
            .finish()
    }
}
