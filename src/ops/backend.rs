// src/ops/backend.rs

//! Pluggable operation backend abstraction.
//!
//! The runtime talks to an `OperationBackend` instead of calling operations
//! itself. This makes it easy to swap in a fake backend in tests while
//! keeping the production implementation here.
//!
//! - `RegistryBackend` is the default implementation used by `sagaflow`.
//!   It looks each call up in an [`OperationRegistry`] and runs it on its
//!   own Tokio task.
//! - Tests can provide their own `OperationBackend` that, for example,
//!   records which calls were scheduled and settles them from a script.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::bus::Action;
use crate::engine::{RuntimeEvent, ScheduledCall};
use crate::errors::Result;
use crate::ops::OperationRegistry;

use super::call_runner::run_call;

/// Trait abstracting how scheduled calls are performed.
pub trait OperationBackend: Send {
    /// Start the given calls.
    ///
    /// The implementation must eventually report one
    /// `RuntimeEvent::OperationSettled` per call, unless the runtime is gone.
    fn dispatch_calls(
        &mut self,
        calls: Vec<ScheduledCall>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: one Tokio task per call.
pub struct RegistryBackend<A> {
    registry: Arc<OperationRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent<A>>,
}

impl<A: Action> RegistryBackend<A> {
    pub fn new(registry: Arc<OperationRegistry>, runtime_tx: mpsc::Sender<RuntimeEvent<A>>) -> Self {
        Self {
            registry,
            runtime_tx,
        }
    }
}

impl<A: Action> OperationBackend for RegistryBackend<A> {
    fn dispatch_calls(
        &mut self,
        calls: Vec<ScheduledCall>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let registry = Arc::clone(&self.registry);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for call in calls {
                let operation = registry.get(&call.operation);
                if operation.is_none() {
                    warn!(call = %call.call, operation = %call.operation, "no operation registered");
                }
                tokio::spawn(run_call(call, operation, tx.clone()));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::{CallId, TaskId};
    use crate::errors::OperationError;
    use crate::test_support::Ping;

    fn call(raw: u64, operation: &str) -> ScheduledCall {
        ScheduledCall {
            call: CallId::from_raw(raw),
            task: TaskId::from_raw(1),
            operation: operation.to_string(),
            args: json!(raw),
        }
    }

    #[tokio::test]
    async fn settles_known_and_unknown_operations() {
        let mut registry = OperationRegistry::new();
        registry
            .register("double", |args: serde_json::Value| async move {
                Ok::<_, OperationError>(json!(args.as_u64().unwrap_or(0) * 2))
            })
            .unwrap();

        let (tx, mut rx) = mpsc::channel::<RuntimeEvent<Ping>>(4);
        let mut backend = RegistryBackend::new(Arc::new(registry), tx);
        backend
            .dispatch_calls(vec![call(21, "double"), call(2, "missing")])
            .await
            .unwrap();

        let mut settled = Vec::new();
        for _ in 0..2 {
            match rx.recv().await {
                Some(RuntimeEvent::OperationSettled { call, result }) => settled.push((call, result)),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        settled.sort_by_key(|(call, _)| *call);

        assert_eq!(settled[0].1, Err(OperationError::Unknown("missing".into())));
        assert_eq!(settled[1].1, Ok(json!(42)));
    }
}
