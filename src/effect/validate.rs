// src/effect/validate.rs

//! Static checks on effect descriptors.
//!
//! These run before an effect is interpreted. A rejected effect is not
//! performed; the workflow is resumed with [`WorkflowError::InvalidEffect`]
//! at that point instead. Checks that need supervisor state (for example
//! joining an evicted handle) happen in the interpreter.

use std::collections::HashSet;

use crate::bus::Action;
use crate::effect::Effect;
use crate::engine::TaskId;
use crate::errors::WorkflowError;

/// Engine-wide validation rules.
#[derive(Debug, Clone, Default)]
pub struct EffectRules {
    /// If set, `Invoke` must name one of these operations.
    pub known_operations: Option<HashSet<String>>,
}

impl EffectRules {
    pub fn with_known_operations<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_operations: Some(operations.into_iter().map(Into::into).collect()),
        }
    }
}

/// Validate `effect` yielded by `task`.
pub fn validate_effect<A: Action>(
    effect: &Effect<A>,
    task: TaskId,
    rules: &EffectRules,
) -> Result<(), WorkflowError> {
    match effect {
        Effect::Invoke { operation, .. } => {
            if operation.trim().is_empty() {
                return Err(WorkflowError::InvalidEffect(
                    "invoke requires a non-empty operation name".to_string(),
                ));
            }
            if let Some(known) = &rules.known_operations {
                if !known.contains(operation) {
                    return Err(WorkflowError::InvalidEffect(format!(
                        "invoke of unknown operation '{operation}'"
                    )));
                }
            }
        }
        Effect::ReadState(selector) => {
            if selector.segments().next().is_none() {
                return Err(WorkflowError::InvalidEffect(
                    "read_state requires a non-empty selector".to_string(),
                ));
            }
        }
        Effect::Join(target) => {
            if *target == task {
                return Err(WorkflowError::InvalidEffect(format!(
                    "{task} cannot join itself"
                )));
            }
        }
        Effect::Emit(_) | Effect::Fork(_) | Effect::AwaitEvent(_) => {}
    }
    Ok(())
}
