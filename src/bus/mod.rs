// src/bus/mod.rs

//! Ordered action bus.
//!
//! - [`action`] defines the [`Action`] trait: application events carry a
//!   typed payload and a `Copy` kind used for matching.
//! - [`action_bus`] holds the single-threaded publish/subscribe queue that
//!   the core drains one action at a time.

pub mod action;
pub mod action_bus;

pub use action::Action;
pub use action_bus::{ActionBus, Delivery, SubscriptionId};
