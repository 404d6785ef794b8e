use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{Notify, mpsc};

use sagaflow::bus::Action;
use sagaflow::engine::{RuntimeEvent, ScheduledCall};
use sagaflow::errors::{OperationError, Result};
use sagaflow::ops::OperationBackend;

/// Shared, awaitable list of calls a fake backend received.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<ScheduledCall>>>,
    changed: Arc<Notify>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: ScheduledCall) {
        self.calls.lock().unwrap().push(call);
        self.changed.notify_waiters();
    }

    pub fn calls(&self) -> Vec<ScheduledCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Operation names in dispatch order.
    pub fn operations(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.operation).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `n` calls were recorded, then return them.
    pub async fn wait_for(&self, n: usize) -> Vec<ScheduledCall> {
        loop {
            let notified = self.changed.notified();
            if self.len() >= n {
                return self.calls();
            }
            notified.await;
        }
    }
}

/// A fake backend that:
/// - records which calls were dispatched
/// - settles each call with the scripted result for its operation
///   (`OperationError::Unknown` if nothing was scripted).
///
/// Calls from one dispatch batch settle in order, or in reverse order with
/// [`ScriptedBackend::settle_in_reverse`]. Settlements are sent from a
/// spawned task, so a batch never blocks the runtime loop on its own
/// channel capacity.
pub struct ScriptedBackend<A> {
    runtime_tx: mpsc::Sender<RuntimeEvent<A>>,
    responses: HashMap<String, std::result::Result<Value, OperationError>>,
    log: CallLog,
    reverse: bool,
}

impl<A: Action> ScriptedBackend<A> {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent<A>>, log: CallLog) -> Self {
        Self {
            runtime_tx,
            responses: HashMap::new(),
            log,
            reverse: false,
        }
    }

    pub fn succeed(mut self, operation: &str, value: Value) -> Self {
        self.responses.insert(operation.to_string(), Ok(value));
        self
    }

    pub fn fail(mut self, operation: &str, message: &str) -> Self {
        self.responses.insert(
            operation.to_string(),
            Err(OperationError::Rejected(message.to_string())),
        );
        self
    }

    pub fn settle_in_reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

impl<A: Action> OperationBackend for ScriptedBackend<A> {
    fn dispatch_calls(
        &mut self,
        mut calls: Vec<ScheduledCall>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        if self.reverse {
            calls.reverse();
        }

        let settlements: Vec<_> = calls
            .into_iter()
            .map(|call| {
                self.log.push(call.clone());
                let result = self
                    .responses
                    .get(&call.operation)
                    .cloned()
                    .unwrap_or_else(|| Err(OperationError::Unknown(call.operation.clone())));
                RuntimeEvent::OperationSettled {
                    call: call.call,
                    result,
                }
            })
            .collect();

        let tx = self.runtime_tx.clone();
        tokio::spawn(async move {
            for event in settlements {
                if tx.send(event).await.is_err() {
                    tracing::warn!("runtime channel closed; dropping scripted settlement");
                    return;
                }
            }
        });

        Box::pin(async { Ok(()) })
    }
}

/// A fake backend that only records calls. The test settles them itself by
/// sending `RuntimeEvent::OperationSettled`, in whatever order it wants.
#[derive(Clone, Default)]
pub struct ManualBackend {
    log: CallLog,
}

impl ManualBackend {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl OperationBackend for ManualBackend {
    fn dispatch_calls(
        &mut self,
        calls: Vec<ScheduledCall>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        for call in calls {
            self.log.push(call);
        }
        Box::pin(async { Ok(()) })
    }
}
