// src/ops/call_runner.rs

//! Individual operation call runner.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bus::Action;
use crate::engine::{RuntimeEvent, ScheduledCall};
use crate::errors::OperationError;
use crate::ops::Operation;

/// Run a single call and report `OperationSettled` to the runtime.
///
/// A missing operation settles the call with [`OperationError::Unknown`] so
/// the invoking workflow still resumes. If the instance was cancelled while
/// the call ran, the runtime discards the settlement.
pub async fn run_call<A: Action>(
    call: ScheduledCall,
    operation: Option<Arc<dyn Operation>>,
    runtime_tx: mpsc::Sender<RuntimeEvent<A>>,
) {
    let ScheduledCall {
        call: call_id,
        task,
        operation: name,
        args,
    } = call;

    debug!(call = %call_id, %task, operation = %name, "starting operation call");

    let result = match operation {
        Some(op) => op.call(args).await,
        None => Err(OperationError::Unknown(name.clone())),
    };

    match &result {
        Ok(_) => debug!(call = %call_id, %task, operation = %name, "operation call finished"),
        Err(err) => info!(
            call = %call_id,
            %task,
            operation = %name,
            error = %err,
            "operation call failed"
        ),
    }

    if runtime_tx
        .send(RuntimeEvent::OperationSettled {
            call: call_id,
            result,
        })
        .await
        .is_err()
    {
        warn!(call = %call_id, "runtime event channel closed; dropping settlement");
    }
}
