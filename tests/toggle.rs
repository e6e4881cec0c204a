mod common;

use pollable_sync::{Events, OnExec, ReadWriteToggle, ToggleState};

use common::poll_state;

#[test]
fn starts_read_write() {
    let toggle = ReadWriteToggle::new(OnExec::Close).unwrap();
    assert_eq!(toggle.state(), ToggleState::ReadWrite);
    assert_eq!(poll_state(toggle.fd()), Events::READ | Events::WRITE);
}

#[test]
fn set_state_is_idempotent() {
    let mut toggle = ReadWriteToggle::new(OnExec::Close).unwrap();
    toggle.set_state(ToggleState::ReadWrite).unwrap();
    assert_eq!(poll_state(toggle.fd()), Events::READ | Events::WRITE);
}

fn check_transition(from: ToggleState, to: ToggleState, expected: Events) {
    let mut toggle = ReadWriteToggle::new(OnExec::Close).unwrap();
    toggle.set_state(from).unwrap();
    toggle.set_state(to).unwrap();
    assert_eq!(toggle.state(), to);
    assert_eq!(
        poll_state(toggle.fd()),
        expected,
        "transition {:?} -> {:?}",
        from,
        to
    );
}

#[test]
fn read_only_to_read_write() {
    check_transition(
        ToggleState::ReadOnly,
        ToggleState::ReadWrite,
        Events::READ | Events::WRITE,
    );
}

#[test]
fn read_only_to_write_only() {
    check_transition(ToggleState::ReadOnly, ToggleState::WriteOnly, Events::WRITE);
}

#[test]
fn read_write_to_read_only() {
    check_transition(ToggleState::ReadWrite, ToggleState::ReadOnly, Events::READ);
}

#[test]
fn read_write_to_write_only() {
    check_transition(ToggleState::ReadWrite, ToggleState::WriteOnly, Events::WRITE);
}

#[test]
fn write_only_to_read_only() {
    check_transition(ToggleState::WriteOnly, ToggleState::ReadOnly, Events::READ);
}

#[test]
fn write_only_to_read_write() {
    check_transition(
        ToggleState::WriteOnly,
        ToggleState::ReadWrite,
        Events::READ | Events::WRITE,
    );
}

#[test]
fn full_cycle_returns_to_read_write() {
    let mut toggle = ReadWriteToggle::new(OnExec::Close).unwrap();
    toggle.set_state(ToggleState::WriteOnly).unwrap();
    toggle.set_state(ToggleState::ReadOnly).unwrap();
    toggle.set_state(ToggleState::ReadWrite).unwrap();
    assert_eq!(poll_state(toggle.fd()), Events::READ | Events::WRITE);
}
