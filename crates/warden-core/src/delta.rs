//! Change detection for sets mutated in place.
//!
//! Reconciliation only persists a collection when its permission set really
//! changed size. Union can only grow a set and difference can only shrink
//! it, so comparing cardinalities before and after is an exact change test
//! for both operations.

use std::collections::BTreeSet;

/// Cardinality of a set before and after an in-place mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDelta {
    pub before: usize,
    pub after: usize,
}

impl SetDelta {
    /// Run `mutate` on `set` and record its size on both sides.
    pub fn measure<T, F>(set: &mut BTreeSet<T>, mutate: F) -> Self
    where
        T: Ord,
        F: FnOnce(&mut BTreeSet<T>),
    {
        let before = set.len();
        mutate(set);
        Self {
            before,
            after: set.len(),
        }
    }

    /// Add every element of `incoming` to `target`.
    pub fn union<T: Ord + Clone>(target: &mut BTreeSet<T>, incoming: &BTreeSet<T>) -> Self {
        Self::measure(target, |set| set.extend(incoming.iter().cloned()))
    }

    /// Remove every element of `outgoing` from `target`.
    pub fn difference<T: Ord>(target: &mut BTreeSet<T>, outgoing: &BTreeSet<T>) -> Self {
        Self::measure(target, |set| set.retain(|item| !outgoing.contains(item)))
    }

    /// At least one element was added.
    pub fn grew(&self) -> bool {
        self.after > self.before
    }

    /// At least one element was removed.
    pub fn shrank(&self) -> bool {
        self.after < self.before
    }

    pub fn is_unchanged(&self) -> bool {
        self.after == self.before
    }
}
