//! Single-worker task runner.
//!
//! # Architecture
//!
//! ```text
//! schedule_task() ──> pending queue ──> worker thread ──> finished queue ──> invoke_*()
//!  (any thread)        FIFO             runs bodies        FIFO             (consumer thread)
//!                                       one at a time
//! ```
//!
//! Task bodies run on the worker thread. Callbacks never do: they run on
//! whichever thread calls one of the `invoke_*` methods. Each queue has its
//! own lock and neither lock is held while a task body or a callback runs,
//! so both may call back into the runner.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use handoff_sync::{BlockingQueue, GuardedState, NotifyCallback};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, TaskError, panic_message};
use crate::task::{FinishedTask, Job, PendingEntry};

/// State shared between the runner, its schedulers, and the worker.
struct Shared<T, E> {
    pending: BlockingQueue<PendingEntry<T, E>>,
    /// Held across the check and the push, so once shutdown flips it no
    /// entry can reach the pending queue.
    accepting: GuardedState<bool>,
}

impl<T, E> Shared<T, E> {
    fn schedule(&self, job: Job<T, E>) -> Result<(), RunnerError> {
        let task = job.into_scheduled()?;
        let rejected = self.accepting.with_lock_ref(|accepting| {
            if *accepting {
                self.pending.push_back(PendingEntry::Run(task));
                None
            } else {
                Some(task)
            }
        });
        // A rejected task is dropped here, outside the lock.
        match rejected {
            Some(_) => Err(RunnerError::Stopped),
            None => Ok(()),
        }
    }

    fn close(&self) {
        self.accepting.set(false);
    }

    fn is_accepting(&self) -> bool {
        self.accepting.get()
    }
}

/// Runs fallible tasks one at a time on a dedicated worker thread.
///
/// Results are handed back only when the owning thread asks for them through
/// [`invoke_callbacks_for_finished_tasks`](Self::invoke_callbacks_for_finished_tasks),
/// [`invoke_next_callback_blocking`](Self::invoke_next_callback_blocking) or
/// [`invoke_next_callback_timeout`](Self::invoke_next_callback_timeout).
/// Delivery methods assume a single consumer thread.
///
/// Dropping the runner (or calling [`shutdown`](Self::shutdown)) discards
/// tasks that have not started, waits for the running task to finish, and
/// drops every result that has not been delivered yet.
///
/// A task the worker has already picked up always runs to completion, even
/// if shutdown begins at that moment.
///
/// A task body that panics ends the worker thread. Report expected failures
/// through `Err` instead.
pub struct TaskRunner<T, E = TaskError> {
    shared: Arc<Shared<T, E>>,
    finished: Arc<BlockingQueue<FinishedTask<T, E>>>,
    processing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    config: RunnerConfig,
}

impl<T, E> TaskRunner<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Result<Self, RunnerError> {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Result<Self, RunnerError> {
        Self::spawn(config, BlockingQueue::new())
    }

    /// Create a runner whose `task_finished` hook is called on the worker
    /// thread every time a result becomes available for delivery.
    ///
    /// The hook is typically used to wake an event loop that then drains
    /// results on its own thread. It must not block for long.
    pub fn with_notify(
        config: RunnerConfig,
        task_finished: NotifyCallback,
    ) -> Result<Self, RunnerError> {
        Self::spawn(config, BlockingQueue::with_notify(task_finished))
    }

    fn spawn(
        config: RunnerConfig,
        finished: BlockingQueue<FinishedTask<T, E>>,
    ) -> Result<Self, RunnerError> {
        // std panics on interior NUL; the name may come from a config file.
        if config.thread_name().contains('\0') {
            return Err(RunnerError::InvalidArgument(
                "thread name cannot contain NUL",
            ));
        }

        let shared = Arc::new(Shared {
            pending: BlockingQueue::new(),
            accepting: GuardedState::new(true),
        });
        let finished = Arc::new(finished);
        let processing = Arc::new(AtomicBool::new(false));

        let worker = thread::Builder::new()
            .name(config.thread_name().to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                let finished = Arc::clone(&finished);
                let processing = Arc::clone(&processing);
                move || run_worker(&shared, &finished, &processing)
            })
            .map_err(RunnerError::Spawn)?;

        tracing::debug!(thread = config.thread_name(), "Task runner started");

        Ok(Self {
            shared,
            finished,
            processing,
            worker: Some(worker),
            config,
        })
    }
}

impl<T, E> TaskRunner<T, E> {
    /// Queue `job` behind every previously scheduled job. Never blocks.
    ///
    /// Fails with [`RunnerError::InvalidArgument`] if the job has no task
    /// body; the queue is left untouched in that case.
    pub fn schedule_task(&self, job: Job<T, E>) -> Result<(), RunnerError> {
        self.shared.schedule(job)
    }

    /// A cloneable handle that schedules onto this runner.
    ///
    /// Handles can be moved into task bodies or other threads. Once the
    /// runner shuts down they fail with [`RunnerError::Stopped`].
    #[must_use]
    pub fn scheduler(&self) -> Scheduler<T, E> {
        Scheduler {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Deliver up to `max_updates` results that are already finished.
    ///
    /// Never waits for a running task. Returns true if finished results are
    /// still waiting afterwards.
    pub fn invoke_callbacks_for_finished_tasks(&self, max_updates: usize) -> bool {
        for _ in 0..max_updates {
            match self.finished.try_pop_front() {
                Some(finished) => finished.deliver(),
                None => break,
            }
        }
        !self.finished.is_empty()
    }

    /// [`invoke_callbacks_for_finished_tasks`](Self::invoke_callbacks_for_finished_tasks)
    /// with the configured batch size.
    pub fn invoke_finished_callbacks(&self) -> bool {
        self.invoke_callbacks_for_finished_tasks(self.config.max_updates())
    }

    /// Wait until a result is finished, then deliver it.
    ///
    /// Returns immediately if a result is already waiting. Blocks forever if
    /// nothing was scheduled.
    pub fn invoke_next_callback_blocking(&self) {
        self.finished.pop_front().deliver();
    }

    /// Like [`invoke_next_callback_blocking`](Self::invoke_next_callback_blocking)
    /// but gives up after `timeout`. Returns whether a result was delivered.
    pub fn invoke_next_callback_timeout(&self, timeout: Duration) -> bool {
        match self.finished.pop_front_timeout(timeout) {
            Some(finished) => {
                finished.deliver();
                true
            }
            None => false,
        }
    }

    /// True while the worker is executing a task body.
    #[must_use]
    pub fn processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Tasks scheduled but not yet started.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.pending.len()
    }

    /// Results finished but not yet delivered.
    #[must_use]
    pub fn finished_len(&self) -> usize {
        self.finished.len()
    }

    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Stop the worker and report whether a task body panicked.
    ///
    /// Same teardown as dropping the runner.
    pub fn shutdown(mut self) -> Result<(), RunnerError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), RunnerError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.shared.close();
        let discarded = self.shared.pending.clear();
        self.shared.pending.push_back(PendingEntry::Stop);

        if worker.thread().id() == thread::current().id() {
            tracing::warn!("Task runner dropped on its own worker thread; not joining");
            return Ok(());
        }

        let joined = worker.join();

        tracing::debug!(
            discarded,
            undelivered = self.finished.len(),
            "Task runner stopped"
        );

        joined.map_err(|payload| RunnerError::WorkerPanicked(panic_message(payload.as_ref())))
    }
}

impl<T, E> Drop for TaskRunner<T, E> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!("Task runner shut down uncleanly: {err}");
        }
    }
}

impl<T, E> fmt::Debug for TaskRunner<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("thread", &self.config.thread_name())
            .field("pending", &self.pending_len())
            .field("finished", &self.finished_len())
            .field("processing", &self.processing())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

/// Schedules onto a [`TaskRunner`] without owning it.
pub struct Scheduler<T, E = TaskError> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Scheduler<T, E> {
    /// Same contract as [`TaskRunner::schedule_task`], plus
    /// [`RunnerError::Stopped`] after the runner has shut down.
    pub fn schedule_task(&self, job: Job<T, E>) -> Result<(), RunnerError> {
        self.shared.schedule(job)
    }

    /// False once the runner has started shutting down.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.shared.is_accepting()
    }
}

impl<T, E> Clone for Scheduler<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Scheduler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}

/// Marks the worker busy; clears the flag on drop, including when a task
/// body unwinds.
struct Busy<'a>(&'a AtomicBool);

impl<'a> Busy<'a> {
    fn enter(processing: &'a AtomicBool) -> Self {
        processing.store(true, Ordering::Release);
        Self(processing)
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn run_worker<T, E>(
    shared: &Shared<T, E>,
    finished: &BlockingQueue<FinishedTask<T, E>>,
    processing: &AtomicBool,
) {
    loop {
        let task = match shared.pending.pop_front() {
            PendingEntry::Run(task) => task,
            PendingEntry::Stop => break,
        };

        let busy = Busy::enter(processing);
        let outcome = task.run();
        finished.push_back(outcome);
        drop(busy);
    }

    tracing::debug!("Task runner worker exiting");
}
