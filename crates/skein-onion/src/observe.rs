//! Last-value introspection cells.
//!
//! Relays and users remember the most recent message they handled so that
//! tests and operators can look at it. Each write replaces the previous
//! value; concurrent writers are last-writer-wins. Protocol code writes
//! these cells but never reads them.

use std::sync::{PoisonError, RwLock};

/// Holds the most recently observed value of `T`.
#[derive(Debug)]
pub struct Observed<T> {
    value: RwLock<Option<T>>,
}

impl<T: Clone> Observed<T> {
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    /// Replace the stored value.
    pub fn set(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    /// Current value, or `None` if nothing was observed yet.
    pub fn get(&self) -> Option<T> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T: Clone> Default for Observed<T> {
    fn default() -> Self {
        Self::new()
    }
}
