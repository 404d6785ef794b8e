// src/ops/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::effect::EffectRules;
use crate::errors::{OperationError, Result, SagaflowError};

pub type OperationFuture = Pin<Box<dyn Future<Output = std::result::Result<Value, OperationError>> + Send>>;

/// An external asynchronous operation a workflow can `Invoke`.
///
/// Settles exactly once; the engine performs no retries.
pub trait Operation: Send + Sync + 'static {
    fn call(&self, args: Value) -> OperationFuture;
}

impl<F, Fut> Operation for F
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, OperationError>> + Send + 'static,
{
    fn call(&self, args: Value) -> OperationFuture {
        Box::pin(self(args))
    }
}

/// Operations by name.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    operations: BTreeMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<O: Operation>(&mut self, name: impl Into<String>, operation: O) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SagaflowError::ConfigError(
                "operation name must not be empty".to_string(),
            ));
        }
        if self.operations.contains_key(&name) {
            return Err(SagaflowError::ConfigError(format!(
                "operation '{name}' is already registered"
            )));
        }
        debug!(operation = %name, "registering operation");
        self.operations.insert(name, Arc::new(operation));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    /// Like [`get`](Self::get), but an unknown name is an error.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Operation>> {
        self.get(name)
            .ok_or_else(|| SagaflowError::UnknownOperation(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Effect rules that reject `Invoke`s of anything not registered here.
    pub fn effect_rules(&self) -> EffectRules {
        EffectRules::with_known_operations(self.names())
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn echo(args: Value) -> std::result::Result<Value, OperationError> {
        Ok(args)
    }

    #[tokio::test]
    async fn registered_closure_is_callable() {
        let mut reg = OperationRegistry::new();
        reg.register("echo", echo).unwrap();

        let op = reg.require("echo").unwrap();
        assert_eq!(op.call(json!({ "a": 1 })).await, Ok(json!({ "a": 1 })));
    }

    #[test]
    fn duplicate_and_unknown_names_are_errors() {
        let mut reg = OperationRegistry::new();
        reg.register("echo", echo).unwrap();

        assert!(matches!(
            reg.register("echo", echo),
            Err(SagaflowError::ConfigError(_))
        ));
        assert!(matches!(
            reg.require("missing"),
            Err(SagaflowError::UnknownOperation(name)) if name == "missing"
        ));
    }

    #[test]
    fn effect_rules_know_registered_names() {
        let mut reg = OperationRegistry::new();
        reg.register("b", echo).unwrap();
        reg.register("a", echo).unwrap();

        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["a", "b"]);
        let known = reg.effect_rules().known_operations.unwrap();
        assert!(known.contains("a") && known.contains("b"));
    }
}
