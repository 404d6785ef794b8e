// src/ops/mod.rs

//! External operation layer.
//!
//! Workflows never call operations directly: an `Invoke` effect becomes a
//! [`ScheduledCall`](crate::engine::ScheduledCall) that the runtime hands to
//! an [`OperationBackend`]. The backend runs the call and reports
//! `RuntimeEvent::OperationSettled` back to the runtime.
//!
//! - [`registry`] holds the [`Operation`] trait and the name → operation map.
//! - [`backend`] provides the `OperationBackend` trait and the production
//!   [`RegistryBackend`].
//! - [`call_runner`] runs one call on its own Tokio task.

pub mod backend;
pub mod call_runner;
pub mod registry;

pub use backend::{OperationBackend, RegistryBackend};
pub use registry::{Operation, OperationFuture, OperationRegistry};
