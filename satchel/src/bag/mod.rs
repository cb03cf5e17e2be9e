//! # Bag Module
//!
//! A thread-safe, unordered, unbounded collection that any number of threads
//! may insert into and remove from at the same time.
//!
//! ## Key Concepts
//! - Storage: a `BagStore` backend does the actual holding of items
//! - Atomic take: `try_remove` tests for and removes an item in one step
//! - Snapshots: `len` and `is_empty` describe one instant only
//! - End of input: `close` tells waiting workers no more items are coming
//! - Cancellation: `cancel` makes every later removal attempt come back empty
//!
//! ## Thread Safety
//! - Every operation takes `&self`; share a bag by reference or `Arc`
//! - Each `insert` and `try_remove` is linearizable
//! - Removal order is unspecified and differs between runs

mod locked;
mod segmented;
mod wakeup;

pub use locked::LockedStore;
pub use segmented::SegmentedStore;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{BagConfig, StoreKind};
use self::wakeup::Wakeup;

/// Storage backend for a `Bag`.
///
/// Implementors must make `pop` a single atomic test-and-take: an item is
/// returned to exactly one caller, and `None` is only returned when the store
/// held no items at some instant during the call.
pub trait BagStore<T>: Send + Sync + fmt::Debug {
    /// Adds an item. Never fails.
    fn push(&self, item: T);

    /// Removes and returns an arbitrary item, or `None` if the store is empty.
    fn pop(&self) -> Option<T>;

    /// Number of items currently held (snapshot in time).
    fn len(&self) -> usize;

    /// Whether the store is currently empty (snapshot in time).
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a removal attempt that may wait for work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Take<T> {
    /// An item was removed and now belongs to the caller.
    Item(T),
    /// Nothing arrived before the timeout; the bag is still open.
    Empty,
    /// The bag is closed and holds nothing more.
    Closed,
    /// The bag was cancelled.
    Cancelled,
}

/// Point-in-time counters of a `Bag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BagStats {
    pub len: usize,
    pub inserted: usize,
    pub removed: usize,
    pub closed: bool,
    pub cancelled: bool,
}

/// Concurrent unordered multiset of work items.
///
/// Items must be `'static` because the backend is stored as a boxed trait
/// object. To work on borrowed data, put owned handles in the bag (indices,
/// `Arc`s) and borrow inside the worker callback, which `WorkerPool::run`
/// allows since its threads are scoped.
///
/// # Examples
///
/// ```rust
/// use satchel::Bag;
///
/// let bag: Bag<u32> = (1..=3).collect();
/// let mut taken = Vec::new();
/// while let Some(item) = bag.try_remove() {
///     taken.push(item);
/// }
/// taken.sort();
/// assert_eq!(taken, vec![1, 2, 3]);
/// assert!(bag.try_remove().is_none());
/// ```
pub struct Bag<T> {
    /// Backend holding the items
    store: Box<dyn BagStore<T>>,

    /// Items ever inserted
    inserted: AtomicUsize,

    /// Items ever handed out by a successful removal
    removed: AtomicUsize,

    /// Set once producers are done
    closed: AtomicBool,

    /// Set once consumers should stop taking items
    cancelled: AtomicBool,

    /// Parking spot for workers waiting on an open population
    wakeup: Wakeup,
}

impl<T: Send + 'static> Bag<T> {
    /// Creates an empty bag on the default lock-free backend.
    pub fn new() -> Self {
        Self::with_store(SegmentedStore::new())
    }

    /// Creates an empty bag using the backend chosen in `config`.
    pub fn with_config(config: &BagConfig) -> Self {
        match config.store {
            StoreKind::Segmented => Self::with_store(SegmentedStore::new()),
            StoreKind::Locked => Self::with_store(LockedStore::new()),
        }
    }

    /// Creates an empty bag on a caller-supplied backend.
    ///
    /// The store should be empty; items already in it are not counted as
    /// inserted.
    pub fn with_store<S: BagStore<T> + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
            inserted: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            wakeup: Wakeup::default(),
        }
    }

    /// Adds an item. Safe to call from any thread at any time.
    ///
    /// Once this returns, the item is visible to every other thread. A closed
    /// bag still accepts items; closing only tells waiting workers that they
    /// may stop once the bag is empty.
    pub fn insert(&self, item: T) {
        if self.closed.load(Ordering::Relaxed) {
            warn!("item inserted into a closed bag");
        }
        // Counted before the push so that `removed` can never overtake it.
        self.inserted.fetch_add(1, Ordering::SeqCst);
        self.store.push(item);
        self.wakeup.notify_one();
    }

    /// Adds every item of `items`.
    pub fn extend<I: IntoIterator<Item = T>>(&self, items: I) {
        for item in items {
            self.insert(item);
        }
    }

    /// Removes and returns an arbitrary item.
    ///
    /// `None` means the bag was empty at the moment of the attempt, or has
    /// been cancelled. Losing a race to another consumer is a normal outcome,
    /// not an error.
    pub fn try_remove(&self) -> Option<T> {
        if self.cancelled.load(Ordering::Acquire) {
            return None;
        }
        let item = self.store.pop()?;
        self.removed.fetch_add(1, Ordering::SeqCst);
        Some(item)
    }

    /// Removes an item, waiting up to `timeout` for one to be inserted.
    ///
    /// Returns early with `Take::Closed` once the bag is closed and empty, or
    /// with `Take::Cancelled` once it is cancelled.
    pub fn take_or_wait(&self, timeout: Duration) -> Take<T> {
        if let Some(take) = self.poll() {
            return take;
        }
        self.wakeup.wait(timeout, || self.poll()).unwrap_or(Take::Empty)
    }

    fn poll(&self) -> Option<Take<T>> {
        if self.is_cancelled() {
            return Some(Take::Cancelled);
        }
        // Read before the removal attempt: closed-then-empty is final.
        let closed = self.is_closed();
        match self.try_remove() {
            Some(item) => Some(Take::Item(item)),
            None if closed => Some(Take::Closed),
            None => None,
        }
    }

    /// Removes every item currently held, ignoring cancellation.
    ///
    /// Items inserted concurrently may or may not be included.
    pub fn drain(&self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.store.len());
        while let Some(item) = self.store.pop() {
            items.push(item);
        }
        self.removed.fetch_add(items.len(), Ordering::SeqCst);
        items
    }

    /// Signals that no more items will be inserted.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(len = self.len(), "bag closed");
        }
        self.wakeup.notify_all();
    }

    /// Makes every later removal attempt fail immediately.
    ///
    /// Removals already in progress complete normally. Items still held stay
    /// in the bag and can be recovered with `drain`.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!(len = self.len(), "bag cancelled");
        }
        self.wakeup.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the bag is empty right now.
    ///
    /// The answer may be stale before the caller acts on it. Never use it to
    /// decide whether `try_remove` will succeed; call `try_remove` instead.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of items held right now. Same caveat as `is_empty`.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Total number of items ever inserted.
    pub fn inserted(&self) -> usize {
        self.inserted.load(Ordering::SeqCst)
    }

    /// Total number of items ever removed.
    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> BagStats {
        // `removed` first: it can only trail `inserted`.
        let removed = self.removed();
        let inserted = self.inserted();
        BagStats {
            len: self.len(),
            inserted,
            removed,
            closed: self.is_closed(),
            cancelled: self.is_cancelled(),
        }
    }
}

impl<T: Send + 'static> Default for Bag<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> FromIterator<T> for Bag<T> {
    fn from_iter<I: IntoIterator<Item = T>>(items: I) -> Self {
        let bag = Self::new();
        bag.extend(items);
        bag
    }
}

impl<T> fmt::Debug for Bag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bag")
            .field("store", &self.store)
            .field("inserted", &self.inserted.load(Ordering::Relaxed))
            .field("removed", &self.removed.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish()
    }
}
