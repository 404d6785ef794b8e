// src/state/mod.rs

//! State snapshot collaborator.
//!
//! The engine never mutates state itself. Every published action is handed
//! to the configured [`Store`] (the reducer) before it is queued for
//! delivery, and `ReadState` effects query the store through a [`Selector`].

use std::fmt;

use serde_json::{Map, Value};

/// Named query against the state snapshot.
///
/// Selectors are dotted paths (`"news.latest"`); how a store interprets them
/// is up to the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(String);

impl Selector {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments separated by `.`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reducer + snapshot reader.
pub trait Store<A>: Send + 'static {
    /// Fold a published action into the snapshot.
    fn reduce(&mut self, action: &A);

    /// Read a value from the current snapshot. `None` means the selector is
    /// not known to this store.
    fn select(&self, selector: &Selector) -> Option<Value>;
}

/// Store for engines that never read state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoState;

impl<A> Store<A> for NoState {
    fn reduce(&mut self, _action: &A) {}

    fn select(&self, _selector: &Selector) -> Option<Value> {
        None
    }
}

type JsonReducer<A> = Box<dyn FnMut(&mut Map<String, Value>, &A) + Send>;

/// Store backed by a JSON object and a reducer closure.
///
/// Selectors walk the object by dotted path.
pub struct JsonStore<A> {
    state: Map<String, Value>,
    reducer: JsonReducer<A>,
}

impl<A> JsonStore<A> {
    pub fn new<F>(initial: Map<String, Value>, reducer: F) -> Self
    where
        F: FnMut(&mut Map<String, Value>, &A) + Send + 'static,
    {
        Self {
            state: initial,
            reducer: Box::new(reducer),
        }
    }

    pub fn snapshot(&self) -> &Map<String, Value> {
        &self.state
    }
}

impl<A: 'static> Store<A> for JsonStore<A> {
    fn reduce(&mut self, action: &A) {
        (self.reducer)(&mut self.state, action);
    }

    fn select(&self, selector: &Selector) -> Option<Value> {
        let mut segments = selector.segments();
        let mut current = self.state.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }
}

impl<A> fmt::Debug for JsonStore<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_store_selects_nested_paths() {
        let mut initial = Map::new();
        initial.insert("count".into(), json!(0));
        let mut store = JsonStore::new(initial, |state, delta: &i64| {
            let next = state["count"].as_i64().unwrap_or(0) + delta;
            state.insert("count".into(), json!(next));
            state.insert("last".into(), json!({ "delta": delta }));
        });

        store.reduce(&3);
        store.reduce(&-1);

        assert_eq!(store.select(&"count".into()), Some(json!(2)));
        assert_eq!(store.select(&"last.delta".into()), Some(json!(-1)));
        assert_eq!(store.select(&"missing".into()), None);
        assert_eq!(store.select(&"".into()), None);
    }
}
