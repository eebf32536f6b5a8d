//! Hand fallible work to a dedicated background thread and collect the
//! results on the thread that owns the runner.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use handoff_runner::{Job, TaskError, TaskRunner};
//!
//! let runner = TaskRunner::<u32>::new()?;
//! let total = Arc::new(Mutex::new(0));
//!
//! let sum = Arc::clone(&total);
//! runner.schedule_task(
//!     Job::new(|| Ok(2 + 2))
//!         .on_completion(move |n| *sum.lock().unwrap() += n)
//!         .on_error(|err: TaskError| eprintln!("{err}")),
//! )?;
//!
//! // Callbacks only run when the owner asks for them.
//! runner.invoke_next_callback_blocking();
//! assert_eq!(*total.lock().unwrap(), 4);
//! # Ok::<(), handoff_runner::RunnerError>(())
//! ```
//!
//! - **`runner`**: [`TaskRunner`] and the detachable [`Scheduler`] handle
//! - **`task`**: [`Job`] builder and callback types
//! - **`error`**: [`RunnerError`] and the default task error [`TaskError`]
//! - **`config`**: [`RunnerConfig`] loaded from TOML

pub mod config;
pub mod error;
pub mod runner;
pub mod task;

pub use config::{ConfigError, HandoffConfig, RunnerConfig, config_path};
pub use error::{RunnerError, TaskError};
pub use handoff_sync::{BlockingQueue, GuardedState, NotifyCallback, ScopedLock};
pub use runner::{Scheduler, TaskRunner};
pub use task::{CompletionCallback, ErrorCallback, Job, Task};
