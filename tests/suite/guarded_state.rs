//! GuardedState used directly and alongside a runner

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use handoff_runner::{GuardedState, Job, TaskError};

use crate::common::runner;

#[test]
fn notify_all_wakes_fifty_waiters() {
    #[derive(Default)]
    struct Shared {
        released: bool,
        woken: usize,
    }

    let state = Arc::new(GuardedState::new(Shared::default()));

    let waiters: Vec<_> = (0..50)
        .map(|_| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                state.wait_then(|shared| shared.released, |shared| shared.woken += 1);
            })
        })
        .collect();

    state.with_lock(|shared| shared.released = true);
    state.notify_all();

    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(state.with_lock_ref(|shared| shared.woken), 50);
}

#[test]
fn wait_times_out_when_nobody_notifies() {
    let state = GuardedState::new(false);
    let mut ran = false;

    let outcome = state.wait_then_timeout(Duration::from_millis(20), |ready| *ready, |_| ran = true);

    assert!(outcome.is_none());
    assert!(!ran);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    NotConnected,
    AttemptingToConnect,
    Connected,
}

#[derive(Debug)]
struct Connection {
    state: ConnectionState,
    address: Option<String>,
    transitions: Vec<ConnectionState>,
}

impl Connection {
    fn transition(&mut self, next: ConnectionState) {
        self.state = next;
        self.transitions.push(next);
    }
}

#[test]
fn connection_state_guarded_while_connect_runs_on_worker() {
    let connection = Arc::new(GuardedState::new(Connection {
        state: ConnectionState::NotConnected,
        address: None,
        transitions: Vec::new(),
    }));
    let runner = runner::<String>();

    connection.with_lock(|conn| conn.transition(ConnectionState::AttemptingToConnect));

    let on_worker = Arc::clone(&connection);
    let on_consumer = Arc::clone(&connection);
    runner
        .schedule_task(
            Job::new(move || {
                // Stand-in for a blocking connect call.
                thread::sleep(Duration::from_millis(20));
                let address = String::from("127.0.0.1:50051");
                on_worker.with_lock(|conn| conn.transition(ConnectionState::Connected));
                on_worker.notify_all();
                Ok(address)
            })
            .on_completion(move |address| {
                let lock = on_consumer.scoped_lock();
                assert_eq!(lock.with(|conn| conn.state), ConnectionState::Connected);
                lock.with(|conn| conn.address = Some(address));
            })
            .on_error(|err: TaskError| panic!("connect failed: {err}")),
        )
        .unwrap();

    let connected = connection.wait_then_timeout(
        Duration::from_secs(5),
        |conn| conn.state == ConnectionState::Connected,
        |conn| conn.state,
    );
    assert_eq!(connected, Some(ConnectionState::Connected));

    runner.invoke_next_callback_blocking();

    let snapshot = connection.with_lock_ref(|conn| (conn.address.clone(), conn.transitions.clone()));
    assert_eq!(snapshot.0.as_deref(), Some("127.0.0.1:50051"));
    assert_eq!(
        snapshot.1,
        vec![ConnectionState::AttemptingToConnect, ConnectionState::Connected]
    );
}
