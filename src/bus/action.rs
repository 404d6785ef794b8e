// src/bus/action.rs

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// An event published on the bus.
///
/// Implementors are normally an enum with one variant per kind, so the
/// mapping from kind to payload type is checked by the compiler:
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// enum CartAction { ItemAdded(ItemId), CheckedOut }
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum CartKind { ItemAdded, CheckedOut }
///
/// impl Action for CartAction {
///     type Kind = CartKind;
///     fn kind(&self) -> CartKind { /* match self */ }
/// }
/// ```
///
/// `Kind` must round-trip through `Display`/`FromStr` so policies can be
/// bound from configuration and events seeded from the command line.
pub trait Action: Clone + fmt::Debug + Send + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display + FromStr + Send + 'static;

    fn kind(&self) -> Self::Kind;
}
