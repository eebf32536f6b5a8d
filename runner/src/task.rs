//! Units of work and their completion callbacks.

use std::fmt;

use crate::error::{RunnerError, TaskError};

/// Fallible task body executed on the worker thread.
pub type Task<T, E> = Box<dyn FnOnce() -> Result<T, E> + Send>;
/// Receives a successful task result on the consumer thread.
pub type CompletionCallback<T> = Box<dyn FnOnce(T) + Send>;
/// Receives a failed task result on the consumer thread.
pub type ErrorCallback<E> = Box<dyn FnOnce(E) + Send>;

/// A task body plus the optional callbacks that receive its outcome.
///
/// Omitting a callback is valid: an outcome with no matching callback is
/// dropped when it is delivered.
///
/// ```
/// use handoff_runner::{Job, TaskError};
///
/// let job: Job<u64> = Job::new(|| Ok(42))
///     .on_completion(|value| println!("got {value}"))
///     .on_error(|err: TaskError| eprintln!("failed: {err}"));
/// assert!(!job.is_empty());
/// ```
pub struct Job<T, E = TaskError> {
    task: Option<Task<T, E>>,
    on_completion: Option<CompletionCallback<T>>,
    on_error: Option<ErrorCallback<E>>,
}

impl<T, E> Job<T, E> {
    pub fn new(task: impl FnOnce() -> Result<T, E> + Send + 'static) -> Self {
        Self {
            task: Some(Box::new(task)),
            on_completion: None,
            on_error: None,
        }
    }

    /// Assemble a job from already boxed parts. A `None` task makes an empty
    /// job, which scheduling rejects.
    pub fn from_parts(
        task: Option<Task<T, E>>,
        on_completion: Option<CompletionCallback<T>>,
        on_error: Option<ErrorCallback<E>>,
    ) -> Self {
        Self {
            task,
            on_completion,
            on_error,
        }
    }

    pub fn on_completion(mut self, callback: impl FnOnce(T) + Send + 'static) -> Self {
        self.on_completion = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(E) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// True when there is no task body to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.task.is_none()
    }

    pub(crate) fn into_scheduled(self) -> Result<ScheduledTask<T, E>, RunnerError> {
        let Some(task) = self.task else {
            return Err(RunnerError::InvalidArgument("task body cannot be empty"));
        };
        Ok(ScheduledTask {
            task,
            on_completion: self.on_completion,
            on_error: self.on_error,
        })
    }
}

impl<T, E> Default for Job<T, E> {
    fn default() -> Self {
        Self::from_parts(None, None, None)
    }
}

impl<T, E> fmt::Debug for Job<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("task", &self.task.is_some())
            .field("on_completion", &self.on_completion.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// A job accepted into the pending queue.
pub(crate) struct ScheduledTask<T, E> {
    task: Task<T, E>,
    on_completion: Option<CompletionCallback<T>>,
    on_error: Option<ErrorCallback<E>>,
}

impl<T, E> ScheduledTask<T, E> {
    /// Execute the body on the calling thread and keep the callbacks with it.
    pub(crate) fn run(self) -> FinishedTask<T, E> {
        FinishedTask {
            result: (self.task)(),
            on_completion: self.on_completion,
            on_error: self.on_error,
        }
    }
}

/// Entry in the pending queue.
pub(crate) enum PendingEntry<T, E> {
    Run(ScheduledTask<T, E>),
    /// Ends the worker loop.
    Stop,
}

/// A task outcome waiting in the finished queue for delivery.
pub(crate) struct FinishedTask<T, E> {
    result: Result<T, E>,
    on_completion: Option<CompletionCallback<T>>,
    on_error: Option<ErrorCallback<E>>,
}

impl<T, E> FinishedTask<T, E> {
    /// Hand the outcome to the matching callback, or drop it if there is none.
    pub(crate) fn deliver(self) {
        match self.result {
            Ok(value) => match self.on_completion {
                Some(callback) => callback(value),
                None => tracing::trace!("Discarding task result with no completion callback"),
            },
            Err(err) => match self.on_error {
                Some(callback) => callback(err),
                None => tracing::trace!("Discarding task error with no error callback"),
            },
        }
    }
}
