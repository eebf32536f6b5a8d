//! Owned state that can only be touched while its mutex is held.
//!
//! ```
//! use handoff_sync::GuardedState;
//!
//! #[derive(Default)]
//! struct Connection {
//!     attempts: u32,
//!     connected: bool,
//! }
//!
//! let shared = GuardedState::new(Connection::default());
//! shared.with_lock(|conn| {
//!     conn.attempts += 1;
//!     conn.connected = true;
//! });
//! assert!(shared.with_lock_ref(|conn| conn.connected));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A value of type `T` shared across threads through a mutex/condition pair.
///
/// Every read and write goes through a closure that runs while the mutex is
/// held. Waiters block on the paired condition variable until a predicate
/// over the value holds.
///
/// A panic inside a closure unwinds to the caller after the lock is released;
/// the poisoned flag is ignored so the state stays usable afterwards.
///
/// None of the locking methods are reentrant: calling `with_lock` from inside
/// another `with_lock` on the same instance deadlocks. Use
/// [`scoped_lock`](Self::scoped_lock) to run several operations under one
/// acquisition.
pub struct GuardedState<T> {
    data: Mutex<T>,
    condition: Condvar,
}

impl<T> GuardedState<T> {
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            data: Mutex::new(value),
            condition: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `func` with exclusive access to the value and return its result.
    pub fn with_lock<R>(&self, func: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        func(&mut *guard)
    }

    /// Run `func` with read-only access to the value and return its result.
    pub fn with_lock_ref<R>(&self, func: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock();
        func(&*guard)
    }

    /// Copy the current value out.
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with_lock_ref(T::clone)
    }

    /// Replace the current value.
    pub fn set(&self, value: T) {
        drop(self.replace(value));
    }

    /// Replace the current value and return the previous one.
    pub fn replace(&self, value: T) -> T {
        self.with_lock(|data| mem::replace(data, value))
    }

    /// Block until `predicate` holds, then run `func` before releasing the lock.
    ///
    /// The lock is released while waiting. `predicate` is re-checked on every
    /// wake-up, so spurious wake-ups are absorbed. Another thread must change
    /// the value and call [`notify_one`](Self::notify_one) or
    /// [`notify_all`](Self::notify_all) for a blocked waiter to make progress.
    pub fn wait_then<R>(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
        func: impl FnOnce(&mut T) -> R,
    ) -> R {
        let guard = self.lock();
        let mut guard = self
            .condition
            .wait_while(guard, |data| !predicate(&*data))
            .unwrap_or_else(PoisonError::into_inner);
        func(&mut *guard)
    }

    /// Like [`wait_then`](Self::wait_then) but gives up after `timeout`.
    ///
    /// Returns `None` without invoking `func` if `predicate` was still false
    /// when the timeout elapsed. Otherwise `func` runs exactly once and its
    /// result is returned.
    pub fn wait_then_timeout<R>(
        &self,
        timeout: Duration,
        mut predicate: impl FnMut(&T) -> bool,
        func: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let guard = self.lock();
        let (mut guard, wait) = self
            .condition
            .wait_timeout_while(guard, timeout, |data| !predicate(&*data))
            .unwrap_or_else(PoisonError::into_inner);
        if wait.timed_out() {
            return None;
        }
        Some(func(&mut *guard))
    }

    /// Wake one thread blocked in `wait_then`.
    pub fn notify_one(&self) {
        self.condition.notify_one();
    }

    /// Wake every thread blocked in `wait_then`.
    pub fn notify_all(&self) {
        self.condition.notify_all();
    }

    /// Acquire the lock and keep it until the returned handle and all of its
    /// clones are dropped.
    #[must_use]
    pub fn scoped_lock(&self) -> ScopedLock<'_, T> {
        ScopedLock {
            guard: Rc::new(RefCell::new(self.lock())),
        }
    }

    /// Direct access through a unique borrow; no locking needed.
    #[must_use]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.data.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Default> Default for GuardedState<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for GuardedState<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for GuardedState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Mutex's Debug uses try_lock, so formatting never blocks.
        f.debug_struct("GuardedState")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// A held lock on a [`GuardedState`], shared between clones.
///
/// The mutex is released when the last clone is dropped. The handle is not
/// `Send`: it must be dropped on the thread that acquired it.
///
/// Calling [`with`](Self::with) from inside another `with` on the same handle
/// panics instead of deadlocking.
pub struct ScopedLock<'a, T> {
    guard: Rc<RefCell<MutexGuard<'a, T>>>,
}

impl<T> ScopedLock<'_, T> {
    pub fn with<R>(&self, func: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.guard.borrow_mut();
        func(&mut **guard)
    }

    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(|data| data.clone())
    }

    pub fn set(&self, value: T) {
        self.with(|data| *data = value);
    }

    /// Number of live handles sharing this lock.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.guard)
    }
}

impl<T> Clone for ScopedLock<'_, T> {
    fn clone(&self) -> Self {
        Self {
            guard: Rc::clone(&self.guard),
        }
    }
}

impl<T> fmt::Debug for ScopedLock<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedLock")
            .field("handles", &self.handle_count())
            .finish_non_exhaustive()
    }
}
