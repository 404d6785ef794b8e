// src/engine/registrar.rs

use std::fmt;

use tracing::{debug, info};

use crate::bus::Action;
use crate::effect::Workflow;
use crate::engine::supervisor::{CancelReport, Supervisor};
use crate::engine::TaskId;
use crate::errors::{Result, SagaflowError};
use crate::types::LaunchMode;

/// Builds a fresh workflow for the action that triggered it.
pub type WorkflowFactory<A> = Box<dyn Fn(&A) -> Box<dyn Workflow<A>> + Send>;

/// Binding of an action kind to a workflow launch policy.
pub struct DispatchPolicy<A: Action> {
    name: String,
    kind: A::Kind,
    mode: LaunchMode,
    factory: WorkflowFactory<A>,
    /// Root launched by the most recent match.
    last_launched: Option<TaskId>,
    launches: u64,
}

impl<A: Action> DispatchPolicy<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> A::Kind {
        self.kind
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    pub fn launches(&self) -> u64 {
        self.launches
    }

    pub fn last_launched(&self) -> Option<TaskId> {
        self.last_launched
    }
}

impl<A: Action> fmt::Debug for DispatchPolicy<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPolicy")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("launches", &self.launches)
            .field("last_launched", &self.last_launched)
            .finish_non_exhaustive()
    }
}

/// What dispatching one action did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    /// Roots started, in policy registration order.
    pub launched: Vec<TaskId>,
    /// Instances cancelled by `Latest` policies.
    pub superseded: CancelReport,
}

/// Ordered set of dispatch policies.
///
/// Semantics per matching policy, in registration order:
/// - `Every`: always launch a new root.
/// - `Latest`: if the root from the previous match, or anything it forked,
///   is still live, cancel that tree first; then launch.
/// - `First`: launch only if this policy has never launched.
#[derive(Debug)]
pub struct Registrar<A: Action> {
    policies: Vec<DispatchPolicy<A>>,
}

impl<A: Action> Registrar<A> {
    pub fn new() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    /// Register a policy. Names must be unique.
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
        let name = name.into();
        if self.policies.iter().any(|p| p.name == name) {
            return Err(SagaflowError::ConfigError(format!(
                "dispatch policy '{name}' is already registered"
            )));
        }

        debug!(policy = %name, %kind, %mode, "registering dispatch policy");
        self.policies.push(DispatchPolicy {
            name,
            kind,
            mode,
            factory: Box::new(factory),
            last_launched: None,
            launches: 0,
        });
        Ok(())
    }

    pub fn policies(&self) -> impl Iterator<Item = &DispatchPolicy<A>> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Notify every policy matching `action`.
    pub fn dispatch(&mut self, action: &A, supervisor: &mut Supervisor<A>) -> DispatchReport {
        let kind = action.kind();
        let mut report = DispatchReport::default();

        for policy in self.policies.iter_mut().filter(|p| p.kind == kind) {
            match policy.mode {
                LaunchMode::Every => {}
                LaunchMode::Latest => {
                    if let Some(previous) = policy.last_launched {
                        if supervisor.has_live_tree(previous) {
                            info!(
                                policy = %policy.name,
                                %previous,
                                "newer action supersedes running instance; cancelling"
                            );
                            report.superseded.merge(supervisor.cancel(previous));
                        }
                    }
                }
                LaunchMode::First => {
                    if policy.launches > 0 {
                        debug!(
                            policy = %policy.name,
                            "policy already launched once; ignoring action (first mode)"
                        );
                        continue;
                    }
                }
            }

            let program = (policy.factory)(action);
            let task = supervisor.spawn_root(program);
            policy.last_launched = Some(task);
            policy.launches += 1;
            info!(
                policy = %policy.name,
                %task,
                mode = %policy.mode,
                launches = policy.launches,
                "launched workflow for action"
            );
            report.launched.push(task);
        }

        report
    }
}

impl<A: Action> Default for Registrar<A> {
    fn default() -> Self {
        Self::new()
    }
}
