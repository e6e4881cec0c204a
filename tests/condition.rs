mod common;

use std::sync::{Arc, Mutex};
use std::thread;

use pollable_sync::{Condition, ConditionGuard, Errno, Events};

use common::{ms, poll_state, wait_readable};

fn spawn_waiter(
    condition: &Arc<Condition>,
    id: u32,
    woken: &Arc<Mutex<Vec<u32>>>,
) -> thread::JoinHandle<bool> {
    let condition = condition.clone();
    let woken = woken.clone();
    thread::spawn(move || {
        let notified = condition.wait_timeout(Some(ms(2000))).unwrap();
        if notified {
            woken.lock().unwrap().push(id);
        }
        notified
    })
}

// notify_one wakes the most recently enqueued waiter first.
#[test]
fn notify_one_is_lifo() {
    let condition = Arc::new(Condition::new());
    let woken = Arc::new(Mutex::new(Vec::new()));

    let first = spawn_waiter(&condition, 1, &woken);
    thread::sleep(ms(50));
    let second = spawn_waiter(&condition, 2, &woken);
    thread::sleep(ms(50));

    condition.notify_one().unwrap();
    thread::sleep(ms(50));
    assert_eq!(*woken.lock().unwrap(), vec![2]);

    condition.notify_one().unwrap();
    assert!(first.join().unwrap());
    assert!(second.join().unwrap());
    assert_eq!(*woken.lock().unwrap(), vec![2, 1]);
}

#[test]
fn notify_all_wakes_every_waiter() {
    let condition = Arc::new(Condition::new());
    let woken = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..4)
        .map(|id| spawn_waiter(&condition, id, &woken))
        .collect();
    thread::sleep(ms(100));

    condition.notify_all().unwrap();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(woken.lock().unwrap().len(), 4);
}

#[test]
fn wait_times_out() {
    let condition = Condition::new();
    assert!(!condition.wait_timeout(Some(ms(50))).unwrap());
}

// A ticket left behind by a timed-out wait soaks up one notification;
// later waiters still get theirs.
#[test]
fn stale_ticket_takes_one_notification() {
    let condition = Arc::new(Condition::new());
    assert!(!condition.wait_timeout(Some(ms(10))).unwrap());

    let woken = Arc::new(Mutex::new(Vec::new()));
    let waiter = spawn_waiter(&condition, 7, &woken);
    thread::sleep(ms(50));

    // LIFO: the live waiter is at the back, the stale ticket at the front.
    condition.notify_one().unwrap();
    assert!(waiter.join().unwrap());
}

// The observe / ack cycle: the fd turns readable on notification, stays
// readable until acked, and re-arms afterwards.
#[test]
fn observer_ack_cycle() {
    let condition = Condition::new();
    let fd = condition.observe().unwrap();
    assert_eq!(poll_state(fd) & Events::READ, Events::empty());

    condition.notify_all().unwrap();
    assert!(wait_readable(fd, ms(1000)));

    // A second notification while unacked must not stack: one ack leaves
    // the fd quiet again.
    condition.notify_all().unwrap();
    condition.ack(fd).unwrap();
    assert_eq!(poll_state(fd) & Events::READ, Events::empty());

    condition.notify_all().unwrap();
    assert!(wait_readable(fd, ms(1000)));

    condition.ack(fd).unwrap();
    condition.stop_observing(fd).unwrap();
}

#[test]
fn notify_one_reaches_an_observer() {
    let condition = Condition::new();
    let fd = condition.observe().unwrap();

    condition.notify_one().unwrap();
    assert!(wait_readable(fd, ms(1000)));

    condition.ack(fd).unwrap();
    condition.stop_observing(fd).unwrap();
}

#[test]
fn ack_blocks_until_notified() {
    let condition = Arc::new(Condition::new());
    let fd = condition.observe().unwrap();

    let acker = {
        let condition = condition.clone();
        thread::spawn(move || condition.ack(fd))
    };
    thread::sleep(ms(50));
    condition.notify_all().unwrap();

    acker.join().unwrap().unwrap();
    condition.stop_observing(fd).unwrap();
}

#[test]
fn unknown_fd_is_rejected() {
    let condition = Condition::new();
    assert_eq!(condition.ack(12345).unwrap_err().errno(), Errno::ENOENT);
    assert_eq!(
        condition.stop_observing(12345).unwrap_err().errno(),
        Errno::ENOENT
    );

    let fd = condition.observe().unwrap();
    condition.stop_observing(fd).unwrap();
    assert_eq!(condition.stop_observing(fd).unwrap_err().errno(), Errno::ENOENT);
}

#[test]
fn guard_releases_on_drop() {
    let condition = Condition::new();
    let fd = {
        let guard = ConditionGuard::new(&condition).unwrap();
        assert!(guard.active());

        condition.notify_all().unwrap();
        assert!(wait_readable(guard.fd(), ms(1000)));
        guard.ack().unwrap();
        guard.fd()
    };
    // The guard has stopped observing; the fd is unknown to the condition.
    assert_eq!(condition.ack(fd).unwrap_err().errno(), Errno::ENOENT);
}

#[test]
fn guard_stop_is_idempotent() {
    let condition = Condition::new();
    let mut guard = ConditionGuard::new(&condition).unwrap();
    guard.stop().unwrap();
    assert!(!guard.active());
    assert!(guard.fd() < 0);
    guard.stop().unwrap();
}
