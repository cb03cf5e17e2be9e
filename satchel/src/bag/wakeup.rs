use std::sync::atomic::{AtomicUsize, Ordering, fence};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Parks threads waiting for a bag to receive work or be closed.
///
/// Producers only take the lock when somebody is actually waiting, so a bag
/// nobody waits on pays one fence and one atomic load per insert.
#[derive(Debug, Default)]
pub(crate) struct Wakeup {
    lock: Mutex<()>,
    cond: Condvar,
    waiters: AtomicUsize,
}

impl Wakeup {
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes one waiter, if any. Call after the state change is published.
    pub(crate) fn notify_one(&self) {
        // Pairs with the fence in `wait`: either this load sees the waiter,
        // or the waiter's poll sees our state change.
        fence(Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) == 0 {
            return;
        }
        let _guard = self.guard();
        self.cond.notify_one();
    }

    /// Wakes every waiter.
    pub(crate) fn notify_all(&self) {
        let _guard = self.guard();
        self.cond.notify_all();
    }

    /// Runs `poll`, and if it yields nothing, sleeps until notified or until
    /// `timeout` elapses, then polls once more.
    pub(crate) fn wait<R>(
        &self,
        timeout: Duration,
        mut poll: impl FnMut() -> Option<R>,
    ) -> Option<R> {
        let guard = self.guard();
        self.waiters.fetch_add(1, Ordering::SeqCst);
        fence(Ordering::SeqCst);

        let result = match poll() {
            Some(ready) => Some(ready),
            None => {
                let (guard, _) = self
                    .cond
                    .wait_timeout(guard, timeout)
                    .unwrap_or_else(PoisonError::into_inner);
                drop(guard);
                poll()
            }
        };

        self.waiters.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
