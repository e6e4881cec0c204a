#![allow(dead_code)]

use std::os::unix::io::RawFd;
use std::time::Duration;

use pollable_sync::{Events, OnExec, PollSet, Repeat, Trigger};

/// The readiness of `fd` right now, without blocking.
pub fn poll_state(fd: RawFd) -> Events {
    let mut poll_set = PollSet::with_target(
        fd,
        Events::READ | Events::WRITE,
        Trigger::Level,
        Repeat::Repeating,
        OnExec::Close,
    )
    .unwrap();
    if poll_set.wait(Some(Duration::from_millis(0)), 0).unwrap() {
        poll_set.events()[0].events()
    } else {
        Events::empty()
    }
}

/// Whether `fd` becomes readable within `timeout`.
pub fn wait_readable(fd: RawFd, timeout: Duration) -> bool {
    let mut poll_set = PollSet::with_target(
        fd,
        Events::READ,
        Trigger::Level,
        Repeat::Repeating,
        OnExec::Close,
    )
    .unwrap();
    poll_set.wait(Some(timeout), 0).unwrap()
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
