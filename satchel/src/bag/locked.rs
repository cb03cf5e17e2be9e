use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::BagStore;

/// Bag storage behind a single mutex.
///
/// The emptiness test and the removal happen inside one critical section.
/// Removal takes the most recently pushed item, which is the cheapest `Vec`
/// operation and nothing more.
pub struct LockedStore<T> {
    items: Mutex<Vec<T>>,
}

impl<T> LockedStore<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-sizes the backing vector.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    // `Vec::push` and `Vec::pop` cannot leave the vector half-updated, so a
    // poisoned lock still guards a consistent vector.
    fn items(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for LockedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedStore")
            .field("len", &self.items().len())
            .finish()
    }
}

impl<T: Send> BagStore<T> for LockedStore<T> {
    fn push(&self, item: T) {
        self.items().push(item);
    }

    fn pop(&self) -> Option<T> {
        self.items().pop()
    }

    fn len(&self) -> usize {
        self.items().len()
    }
}
