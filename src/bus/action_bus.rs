// src/bus/action_bus.rs

//! Single-threaded ordered publish/subscribe queue.
//!
//! Publishing only enqueues. The core pulls one action at a time with
//! [`ActionBus::deliver_next`], which runs every matching handler and
//! collects every matching one-shot waiter before returning, so delivery of
//! one action always completes before the next one starts.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, trace};

use crate::bus::Action;
use crate::engine::TaskId;

/// Handle returned by `subscribe*`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Handler<A> = Box<dyn FnMut(&A) + Send>;

enum Subscriber<A> {
    /// Persistent callback owned by an external actor.
    Handler(Handler<A>),
    /// Workflow suspended on `AwaitEvent`; removed after the first match.
    Waiter(TaskId),
}

struct Subscription<A: Action> {
    id: SubscriptionId,
    /// `None` matches every kind.
    kind: Option<A::Kind>,
    subscriber: Subscriber<A>,
}

impl<A: Action> Subscription<A> {
    fn matches(&self, kind: A::Kind) -> bool {
        self.kind.is_none_or(|k| k == kind)
    }
}

/// Result of delivering a single action.
#[derive(Debug)]
pub struct Delivery<A> {
    pub action: A,
    /// Tasks whose one-shot subscription matched, in registration order.
    pub woken: Vec<TaskId>,
    /// Number of persistent handlers that observed the action.
    pub handled: usize,
}

pub struct ActionBus<A: Action> {
    queue: VecDeque<A>,
    subscriptions: Vec<Subscription<A>>,
    next_id: u64,
    published: u64,
}

impl<A: Action> ActionBus<A> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            subscriptions: Vec::new(),
            next_id: 0,
            published: 0,
        }
    }

    /// Enqueue an action for delivery.
    pub fn publish(&mut self, action: A) {
        self.published += 1;
        trace!(kind = %action.kind(), seq = self.published, "action published");
        self.queue.push_back(action);
    }

    /// Register a persistent handler for one kind.
    pub fn subscribe<F>(&mut self, kind: A::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&A) + Send + 'static,
    {
        self.insert(Some(kind), Subscriber::Handler(Box::new(handler)))
    }

    /// Register a persistent handler that observes every action.
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&A) + Send + 'static,
    {
        self.insert(None, Subscriber::Handler(Box::new(handler)))
    }

    /// Register a one-shot waiter for `task`.
    pub(crate) fn subscribe_once(&mut self, kind: A::Kind, task: TaskId) -> SubscriptionId {
        self.insert(Some(kind), Subscriber::Waiter(task))
    }

    /// Remove a subscription. Returns `false` if it was already gone (for
    /// example a waiter that has fired).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    /// Whether any published action is still waiting for delivery.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Total number of actions published so far.
    pub fn published_count(&self) -> u64 {
        self.published
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Pop the oldest queued action and deliver it to every matching
    /// subscription, in registration order.
    pub fn deliver_next(&mut self) -> Option<Delivery<A>> {
        let action = self.queue.pop_front()?;
        let kind = action.kind();

        let mut woken = Vec::new();
        let mut handled = 0;

        self.subscriptions.retain_mut(|sub| {
            if !sub.matches(kind) {
                return true;
            }
            match &mut sub.subscriber {
                Subscriber::Handler(handler) => {
                    handler(&action);
                    handled += 1;
                    true
                }
                Subscriber::Waiter(task) => {
                    woken.push(*task);
                    false
                }
            }
        });

        debug!(%kind, handled, woken = woken.len(), "action delivered");

        Some(Delivery {
            action,
            woken,
            handled,
        })
    }

    fn insert(&mut self, kind: Option<A::Kind>, subscriber: Subscriber<A>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            kind,
            subscriber,
        });
        id
    }
}

impl<A: Action> Default for ActionBus<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> fmt::Debug for ActionBus<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBus")
            .field("queued", &self.queue.len())
            .field("subscriptions", &self.subscriptions.len())
            .field("published", &self.published)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::test_support::{Ping, PingKind};

    #[test]
    fn delivers_in_publication_order() {
        let mut bus = ActionBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe_all(move |a: &Ping| sink.lock().unwrap().push(a.clone()));

        bus.publish(Ping::Tick(1));
        bus.publish(Ping::Stop);
        bus.publish(Ping::Tick(2));

        while bus.deliver_next().is_some() {}

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Ping::Tick(1), Ping::Stop, Ping::Tick(2)]
        );
    }

    #[test]
    fn handler_only_sees_its_kind() {
        let mut bus = ActionBus::new();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(PingKind::Stop, move |_| *c.lock().unwrap() += 1);

        bus.publish(Ping::Tick(1));
        bus.publish(Ping::Stop);
        while bus.deliver_next().is_some() {}

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn waiter_fires_once_and_is_removed() {
        let mut bus = ActionBus::new();
        let task = TaskId::from_raw(7);
        bus.subscribe_once(PingKind::Tick, task);

        bus.publish(Ping::Tick(1));
        bus.publish(Ping::Tick(2));

        let first = bus.deliver_next().unwrap();
        assert_eq!(first.woken, vec![task]);
        let second = bus.deliver_next().unwrap();
        assert!(second.woken.is_empty());
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn unsubscribed_handler_is_not_called() {
        let mut bus = ActionBus::new();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        let id = bus.subscribe_all(move |_: &Ping| *c.lock().unwrap() += 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.publish(Ping::Stop);
        bus.deliver_next();
        assert_eq!(*count.lock().unwrap(), 0);
    }
}
