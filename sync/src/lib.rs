//! Thread-safe building blocks for handing values between threads.
//!
//! - **`guarded`**: [`GuardedState`] owns a value and only exposes it inside a
//!   critical section, with predicate-gated waiting and scoped locks.
//! - **`queue`**: [`BlockingQueue`] is a FIFO hand-off channel with blocking,
//!   timed, and non-blocking receive, built on [`GuardedState`].

pub mod guarded;
pub mod queue;

pub use guarded::{GuardedState, ScopedLock};
pub use queue::{BlockingQueue, NotifyCallback};
