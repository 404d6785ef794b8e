use std::sync::{Arc, Mutex};

use sagaflow::bus::Action;
use sagaflow::engine::CoreRuntime;

/// Records every action delivered on a core's bus, in delivery order.
#[derive(Clone)]
pub struct ActionLog<A> {
    actions: Arc<Mutex<Vec<A>>>,
}

impl<A: Action> ActionLog<A> {
    /// Subscribe a new log to every action of `core`.
    pub fn attach(core: &mut CoreRuntime<A>) -> Self {
        let log = Self {
            actions: Arc::new(Mutex::new(Vec::new())),
        };
        let sink = Arc::clone(&log.actions);
        core.subscribe_all(move |action: &A| sink.lock().unwrap().push(action.clone()));
        log
    }

    pub fn actions(&self) -> Vec<A> {
        self.actions.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<A::Kind> {
        self.actions().iter().map(Action::kind).collect()
    }

    pub fn count(&self, kind: A::Kind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}
