//! handoff - demo driver for the background task runner.
//!
//! ```text
//! main() -> TaskRunner::with_notify(hook) -> schedule N jobs
//!                                               |
//!                     worker thread runs bodies v
//!                          hook -> ready queue -> invoke_finished_callbacks() on main
//! ```
//!
//! Usage: `handoff [TASK_COUNT]` (default 5). Every third task fails on
//! purpose so both callback paths are exercised. Log verbosity follows
//! `RUST_LOG`; the runner section of the config file (see
//! [`handoff_runner::config_path`]) sets the worker thread name and batch size.

use std::env;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use handoff_runner::{BlockingQueue, GuardedState, HandoffConfig, Job, TaskError, TaskRunner};

const DEFAULT_TASK_COUNT: usize = 5;
const TASK_DURATION: Duration = Duration::from_millis(20);
const READY_POLL: Duration = Duration::from_secs(1);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Results go to stdout; keep logs on stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn task_count() -> Result<usize> {
    match env::args().nth(1) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("TASK_COUNT must be a non-negative integer (got {raw:?})")),
        None => Ok(DEFAULT_TASK_COUNT),
    }
}

#[derive(Debug, Default)]
struct Summary {
    succeeded: Vec<(usize, usize)>,
    failed: Vec<TaskError>,
}

impl Summary {
    fn delivered(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

fn square_slowly(index: usize) -> Result<usize, TaskError> {
    thread::sleep(TASK_DURATION);
    if index % 3 == 2 {
        return Err(TaskError::new(format!("task {index} failed on purpose")));
    }
    Ok(index * index)
}

fn main() -> Result<()> {
    init_tracing();

    let count = task_count()?;
    let config = HandoffConfig::load()
        .context("Failed to load handoff config")?
        .unwrap_or_default();

    let ready = Arc::new(BlockingQueue::<()>::new());
    let hook = Arc::clone(&ready);
    let runner = TaskRunner::<usize>::with_notify(
        config.runner.clone(),
        Arc::new(move || hook.push_back(())),
    )
    .context("Failed to start task runner")?;

    let summary = Arc::new(GuardedState::new(Summary::default()));
    let start = Instant::now();

    for index in 0..count {
        let on_success = Arc::clone(&summary);
        let on_failure = Arc::clone(&summary);
        runner.schedule_task(
            Job::new(move || square_slowly(index))
                .on_completion(move |square| {
                    on_success.with_lock(|s| s.succeeded.push((index, square)));
                })
                .on_error(move |err| on_failure.with_lock(|s| s.failed.push(err))),
        )?;
    }
    tracing::info!(
        count,
        thread = runner.config().thread_name(),
        "Scheduled tasks"
    );

    while summary.with_lock_ref(Summary::delivered) < count {
        if ready.pop_front_timeout(READY_POLL).is_none() {
            tracing::debug!(
                pending = runner.pending_len(),
                processing = runner.processing(),
                "Still waiting for results"
            );
            continue;
        }
        while runner.invoke_finished_callbacks() {}
    }

    let elapsed = start.elapsed();
    runner.shutdown().context("Task runner did not shut down cleanly")?;

    summary.with_lock_ref(|s| {
        for (index, square) in &s.succeeded {
            println!("ok    {index:>4} -> {square}");
        }
        for err in &s.failed {
            println!("error {err}");
        }
        println!(
            "{} succeeded, {} failed in {:.1?}",
            s.succeeded.len(),
            s.failed.len(),
            elapsed
        );
    });

    Ok(())
}
