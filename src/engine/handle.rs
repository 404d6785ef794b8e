// src/engine/handle.rs

use tokio::sync::mpsc;
use tracing::debug;

use crate::bus::Action;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, SagaflowError};

/// Cloneable handle external actors use to talk to a running engine.
#[derive(Debug)]
pub struct EngineHandle<A> {
    tx: mpsc::Sender<RuntimeEvent<A>>,
}

impl<A> Clone for EngineHandle<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A: Action> EngineHandle<A> {
    pub fn new(tx: mpsc::Sender<RuntimeEvent<A>>) -> Self {
        Self { tx }
    }

    /// Publish an action. The reducer and all subscribers see it before any
    /// later-published action.
    pub async fn publish(&self, action: A) -> Result<()> {
        debug!(kind = %action.kind(), "publishing action through engine handle");
        self.send(RuntimeEvent::Publish(action)).await
    }

    /// Ask the runtime loop to stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(RuntimeEvent::ShutdownRequested).await
    }

    /// Raw sender, for operation backends that report settlements.
    pub fn sender(&self) -> mpsc::Sender<RuntimeEvent<A>> {
        self.tx.clone()
    }

    async fn send(&self, event: RuntimeEvent<A>) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| SagaflowError::ChannelClosed("runtime event channel".to_string()))
    }
}
