//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use handoff_runner::{BlockingQueue, RunnerConfig, TaskRunner};

/// Runner with default settings.
pub fn runner<T: Send + 'static>() -> TaskRunner<T> {
    TaskRunner::new().expect("worker thread should spawn")
}

/// Runner whose finish hook pushes a unit onto the returned queue.
pub fn signalling_runner<T: Send + 'static>() -> (TaskRunner<T>, Arc<BlockingQueue<()>>) {
    let signals = Arc::new(BlockingQueue::new());
    let hook = Arc::clone(&signals);
    let runner = TaskRunner::with_notify(
        RunnerConfig::default(),
        Arc::new(move || hook.push_back(())),
    )
    .expect("worker thread should spawn");
    (runner, signals)
}

/// Block until `count` tasks have reported completion through the hook.
pub fn wait_for_signals(signals: &BlockingQueue<()>, count: usize) {
    for _ in 0..count {
        signals.pop_front();
    }
}

/// Shared counter plus a callback that bumps it.
pub fn counter<A: 'static>() -> (Arc<AtomicUsize>, impl FnOnce(A) + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&count);
    (count, move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
    })
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
