//! FIFO hand-off queue between threads.

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use crate::guarded::GuardedState;

/// Called after every push, outside the queue's lock.
///
/// Under concurrent pushers the calls are not necessarily observed in push
/// order. The callback may touch the queue it is attached to.
pub type NotifyCallback = Arc<dyn Fn() + Send + Sync>;

/// Thread-safe FIFO queue with blocking and timed receive.
///
/// Items are delivered in push order and each item reaches exactly one pop.
pub struct BlockingQueue<T> {
    items: GuardedState<VecDeque<T>>,
    notify: Option<NotifyCallback>,
}

impl<T> BlockingQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: GuardedState::default(),
            notify: None,
        }
    }

    /// Create a queue that calls `notify` every time an item is added.
    #[must_use]
    pub fn with_notify(notify: NotifyCallback) -> Self {
        Self {
            items: GuardedState::default(),
            notify: Some(notify),
        }
    }

    pub fn push_back(&self, item: T) {
        self.items.with_lock(|items| items.push_back(item));
        self.items.notify_one();
        if let Some(notify) = &self.notify {
            notify();
        }
    }

    pub fn emplace_back(&self, item: impl Into<T>) {
        self.push_back(item.into());
    }

    /// Block until an item is available and remove it.
    pub fn pop_front(&self) -> T {
        loop {
            // `wait_then` only pops once the deque is non-empty.
            if let Some(item) = self
                .items
                .wait_then(|items| !items.is_empty(), VecDeque::pop_front)
            {
                return item;
            }
        }
    }

    /// Remove the front item, or return `None` if `timeout` elapses first.
    pub fn pop_front_timeout(&self, timeout: Duration) -> Option<T> {
        self.items
            .wait_then_timeout(timeout, |items| !items.is_empty(), VecDeque::pop_front)
            .flatten()
    }

    /// Remove the front item if there is one, without waiting.
    pub fn try_pop_front(&self) -> Option<T> {
        self.items.with_lock(VecDeque::pop_front)
    }

    /// Remove every item and return how many were removed.
    ///
    /// The items are detached under the lock and dropped after it is
    /// released, front to back, so an item's `Drop` may push onto this queue.
    pub fn clear(&self) -> usize {
        let detached = self.items.with_lock(mem::take);
        let count = detached.len();
        detached.into_iter().for_each(drop);
        if count > 0 {
            tracing::trace!(count, "Cleared blocking queue");
        }
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.with_lock_ref(VecDeque::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.with_lock_ref(VecDeque::is_empty)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("len", &self.len())
            .field("notify", &self.notify.is_some())
            .finish()
    }
}
