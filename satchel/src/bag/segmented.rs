use std::fmt;

use crossbeam_queue::SegQueue;

use super::BagStore;

/// Lock-free bag storage backed by a segmented queue.
///
/// Push and pop are each a single linearizable step, so concurrent callers
/// never observe a half-inserted or twice-removed item. Items happen to come
/// back out in insertion order; callers must not rely on it.
pub struct SegmentedStore<T> {
    /// Unbounded lock-free queue holding the items
    queue: SegQueue<T>,
}

impl<T> SegmentedStore<T> {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }
}

impl<T> Default for SegmentedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SegmentedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedStore")
            .field("len", &self.queue.len())
            .finish()
    }
}

impl<T: Send> BagStore<T> for SegmentedStore<T> {
    fn push(&self, item: T) {
        self.queue.push(item);
    }

    fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
