mod common;

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use pollable_sync::{
    Errno, EventFd, EventFdFlags, Events, OnExec, PollSet, Repeat, Trigger,
};

use common::ms;

fn level_add(poll_set: &mut PollSet, fd: i32, events: Events) {
    poll_set
        .add(fd, events, Trigger::Level, Repeat::Repeating)
        .unwrap();
}

#[test]
fn add_rejects_duplicates() {
    let event_fd = EventFd::new(0, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set = PollSet::new(OnExec::Close).unwrap();

    level_add(&mut poll_set, event_fd.fd(), Events::READ);
    assert_eq!(poll_set.num_targets(), 1);

    let err = poll_set
        .add(event_fd.fd(), Events::READ, Trigger::Level, Repeat::Repeating)
        .unwrap_err();
    assert_eq!(err.errno(), Errno::EEXIST);
    assert_eq!(poll_set.num_targets(), 1);
}

#[test]
fn modify_and_remove_require_registration() {
    let event_fd = EventFd::new(0, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set = PollSet::new(OnExec::Close).unwrap();

    let err = poll_set
        .modify(event_fd.fd(), Events::READ, Trigger::Level, Repeat::Repeating)
        .unwrap_err();
    assert_eq!(err.errno(), Errno::ENOENT);
    assert_eq!(poll_set.remove(event_fd.fd()).unwrap_err().errno(), Errno::ENOENT);

    level_add(&mut poll_set, event_fd.fd(), Events::READ);
    poll_set
        .modify(event_fd.fd(), Events::WRITE, Trigger::Level, Repeat::Repeating)
        .unwrap();
    poll_set.remove(event_fd.fd()).unwrap();
    assert_eq!(poll_set.num_targets(), 0);
}

#[test]
fn wait_reports_readability() {
    let event_fd = EventFd::new(0, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set =
        PollSet::with_target(event_fd.fd(), Events::READ, Trigger::Level, Repeat::Repeating, OnExec::Close)
            .unwrap();

    assert!(!poll_set.wait(Some(ms(50)), 0).unwrap());
    assert!(poll_set.events().is_empty());

    event_fd.write_u64(1).unwrap();
    assert!(poll_set.wait(Some(ms(1000)), 0).unwrap());
    assert_eq!(poll_set.events().len(), 1);
    assert_eq!(poll_set.events()[0].fd(), event_fd.fd());
    assert_eq!(poll_set.events()[0].events(), Events::READ);
}

#[test]
fn wait_reports_writability() {
    let event_fd = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set = PollSet::new(OnExec::Close).unwrap();
    level_add(&mut poll_set, event_fd.fd(), Events::READ | Events::WRITE);

    assert!(poll_set.wait(Some(ms(0)), 0).unwrap());
    assert_eq!(poll_set.events()[0].events(), Events::READ | Events::WRITE);
}

#[test]
fn wait_wakes_from_another_thread() {
    let event_fd = Arc::new(EventFd::new(0, EventFdFlags::CLOEXEC).unwrap());
    let mut poll_set =
        PollSet::with_target(event_fd.fd(), Events::READ, Trigger::Level, Repeat::Repeating, OnExec::Close)
            .unwrap();

    let writer = {
        let event_fd = event_fd.clone();
        thread::spawn(move || {
            thread::sleep(ms(50));
            event_fd.write_u64(1).unwrap();
        })
    };

    let start = Instant::now();
    assert!(poll_set.wait(Some(ms(2000)), 0).unwrap());
    assert!(start.elapsed() < ms(1000));
    writer.join().unwrap();
}

#[test]
fn one_shot_disarms_after_delivery() {
    let event_fd = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set =
        PollSet::with_target(event_fd.fd(), Events::READ, Trigger::Level, Repeat::OneShot, OnExec::Close)
            .unwrap();

    assert!(poll_set.wait(Some(ms(1000)), 0).unwrap());
    // Still readable, but the registration went quiet.
    assert!(!poll_set.wait(Some(ms(50)), 0).unwrap());

    // Re-arming it brings the event back.
    poll_set
        .modify(event_fd.fd(), Events::READ, Trigger::Level, Repeat::Repeating)
        .unwrap();
    assert!(poll_set.wait(Some(ms(1000)), 0).unwrap());
}

#[test]
fn edge_trigger_reports_transitions_only() {
    let event_fd = EventFd::new(0, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set =
        PollSet::with_target(event_fd.fd(), Events::READ, Trigger::Edge, Repeat::Repeating, OnExec::Close)
            .unwrap();

    event_fd.write_u64(1).unwrap();
    assert!(poll_set.wait(Some(ms(1000)), 0).unwrap());
    // No new edge, no event, even though the fd stays readable.
    assert!(!poll_set.wait(Some(ms(50)), 0).unwrap());

    event_fd.write_u64(1).unwrap();
    assert!(poll_set.wait(Some(ms(1000)), 0).unwrap());
}

#[test]
fn clear_discards_registrations() {
    let first = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let second = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set = PollSet::new(OnExec::Close).unwrap();
    level_add(&mut poll_set, first.fd(), Events::READ);
    level_add(&mut poll_set, second.fd(), Events::READ);
    assert_eq!(poll_set.num_targets(), 2);

    poll_set.clear().unwrap();
    assert_eq!(poll_set.num_targets(), 0);
    assert!(!poll_set.wait(Some(ms(50)), 0).unwrap());

    // The old registrations are gone; the fds can be added afresh.
    level_add(&mut poll_set, first.fd(), Events::READ);
    assert!(poll_set.wait(Some(ms(1000)), 0).unwrap());
}

#[test]
fn wait_returns_multiple_ready_fds() {
    let first = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let second = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set = PollSet::new(OnExec::Close).unwrap();
    level_add(&mut poll_set, first.fd(), Events::READ);
    level_add(&mut poll_set, second.fd(), Events::READ);

    assert!(poll_set.wait(Some(ms(1000)), 0).unwrap());
    let mut fds: Vec<_> = poll_set.events().iter().map(|e| e.fd()).collect();
    fds.sort_unstable();
    let mut expected = vec![first.fd(), second.fd()];
    expected.sort_unstable();
    assert_eq!(fds, expected);
}

#[test]
fn max_events_caps_the_result() {
    let first = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let second = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set = PollSet::new(OnExec::Close).unwrap();
    level_add(&mut poll_set, first.fd(), Events::READ);
    level_add(&mut poll_set, second.fd(), Events::READ);

    assert!(poll_set.wait(Some(ms(1000)), 1).unwrap());
    assert_eq!(poll_set.events().len(), 1);
}

#[test]
fn when_ready_hands_over_the_events() {
    let event_fd = EventFd::new(1, EventFdFlags::CLOEXEC).unwrap();
    let mut poll_set =
        PollSet::with_target(event_fd.fd(), Events::READ, Trigger::Level, Repeat::Repeating, OnExec::Close)
            .unwrap();

    let seen = poll_set.when_ready(0, |events| events[0].fd()).unwrap();
    assert_eq!(seen, event_fd.fd());

    let outcome = poll_set
        .when_ready_or_timeout(Some(ms(50)), 0, |_| "ready", || "timeout")
        .unwrap();
    assert_eq!(outcome, "ready");

    event_fd.read_u64().unwrap();
    let outcome = poll_set
        .when_ready_or_timeout(Some(ms(50)), 0, |_| "ready", || "timeout")
        .unwrap();
    assert_eq!(outcome, "timeout");
}
