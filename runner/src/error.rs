//! Error types for scheduling and running tasks.

use std::any::Any;
use std::io;
use std::panic::Location;

use thiserror::Error;

/// Failures reported by the runner itself, as opposed to task failures.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("task runner has been shut down")]
    Stopped,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Default error value carried by a failed task.
///
/// Records the source location of the [`TaskError::new`] call so the
/// consumer can tell where on the worker thread the failure was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({location})")]
pub struct TaskError {
    message: String,
    location: &'static Location<'static>,
}

impl TaskError {
    #[track_caller]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
