mod guarded_state;
mod teardown;
