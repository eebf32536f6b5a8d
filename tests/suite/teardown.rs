//! Shutdown and drop behaviour

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use handoff_runner::{Job, RunnerError};

use crate::common::{count, counter, runner, signalling_runner, wait_for_signals};

fn sleepy_task() -> Job<Instant> {
    Job::new(|| {
        thread::sleep(Duration::from_millis(100));
        Ok(Instant::now())
    })
}

#[test]
fn drop_discards_pending_tasks() {
    let start = Instant::now();
    {
        let runner = runner::<Instant>();
        for _ in 0..5 {
            runner.schedule_task(sleepy_task()).unwrap();
        }
        // Dropping stops the worker and skips the tasks that have not started.
    }
    // All five tasks would take at least 500ms.
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn running_task_finishes_but_is_never_delivered() {
    let runner = runner::<()>();
    let finished_body = Arc::new(AtomicBool::new(false));
    let (started_tx, started_rx) = mpsc::channel();

    let (delivered, on_completion) = counter();
    let body_flag = Arc::clone(&finished_body);
    runner
        .schedule_task(
            Job::new(move || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
                body_flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .on_completion(on_completion),
        )
        .unwrap();

    let (skipped, on_skipped) = counter();
    runner
        .schedule_task(Job::new(|| Ok(())).on_completion(on_skipped))
        .unwrap();

    started_rx.recv().unwrap();
    drop(runner);

    assert!(finished_body.load(Ordering::SeqCst), "drop must wait for the running task");
    assert_eq!(count(&delivered), 0);
    assert_eq!(count(&skipped), 0);
}

#[test]
fn finished_but_undelivered_results_are_dropped() {
    let (runner, signals) = signalling_runner::<u8>();
    let (delivered, on_completion) = counter();

    runner
        .schedule_task(Job::new(|| Ok(1)).on_completion(on_completion))
        .unwrap();
    wait_for_signals(&signals, 1);
    assert_eq!(runner.finished_len(), 1);

    runner.shutdown().unwrap();
    assert_eq!(count(&delivered), 0);
}

#[test]
fn shutdown_is_clean_for_an_idle_runner() {
    let runner = runner::<u8>();
    assert!(runner.shutdown().is_ok());
}

#[test]
fn shutdown_reports_worker_panic() {
    let runner = runner::<u8>();
    let (started_tx, started_rx) = mpsc::channel();
    runner
        .schedule_task(Job::new(move || {
            started_tx.send(()).unwrap();
            panic!("worker fault")
        }))
        .unwrap();
    started_rx.recv().unwrap();

    let err = runner.shutdown().unwrap_err();
    assert!(matches!(err, RunnerError::WorkerPanicked(ref message) if message == "worker fault"));
}

#[test]
fn scheduler_outliving_runner_is_rejected() {
    let runner = runner::<u8>();
    let scheduler = runner.scheduler();
    drop(runner);

    assert!(matches!(
        scheduler.schedule_task(Job::new(|| Ok(1))),
        Err(RunnerError::Stopped)
    ));
}
