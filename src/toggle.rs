//! Explicit control over the readability and writability of one fd.

use crate::event_fd::{EventFd, EventFdFlags};
use crate::events::OnExec;
use crate::prelude::*;

/// The three readiness states a [`ReadWriteToggle`] can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleState {
    /// The fd is readable and not writable.
    ReadOnly,
    /// The fd is writable and not readable.
    WriteOnly,
    /// The fd is both readable and writable.
    ReadWrite,
}

impl ToggleState {
    /// The eventfd counter value that produces this readiness state.
    ///
    /// An eventfd is readable while its counter is positive and writable
    /// while one more unit would still fit below `u64::MAX`; the three
    /// reserved values pin each combination.
    fn counter_value(self) -> u64 {
        match self {
            ToggleState::ReadOnly => u64::MAX - 1,
            ToggleState::WriteOnly => 0,
            ToggleState::ReadWrite => 1,
        }
    }
}

/// A tri-state signal materialized on a single eventfd.
///
/// One thread sets the state; any number of observers poll the fd and see
/// the readability/writability the state dictates. The intended use is a
/// pollable container flagging "has items" as readable and "has space" as
/// writable. Observers must never read from or write to the fd; only
/// membership in a poll set is permitted.
///
/// A transition out of `ReadOnly` into `ReadWrite` drains the counter and
/// rewrites it, so the fd momentarily stops being readable even though the
/// logical state never did. Edge-triggered observers would see a phantom
/// readable edge there; monitor this fd level-triggered.
///
/// State changes take `&mut self`: the toggle itself is not a
/// synchronization point and relies on external serialization.
pub struct ReadWriteToggle {
    event_fd: EventFd,
    state: ToggleState,
}

impl ReadWriteToggle {
    /// Create a toggle in the `ReadWrite` state.
    pub fn new(on_exec: OnExec) -> Result<ReadWriteToggle> {
        let flags = match on_exec {
            OnExec::Close => EventFdFlags::CLOEXEC,
            OnExec::Keep => EventFdFlags::empty(),
        };
        let event_fd = EventFd::new(ToggleState::ReadWrite.counter_value(), flags)?;
        Ok(ReadWriteToggle {
            event_fd,
            state: ToggleState::ReadWrite,
        })
    }

    /// The fd whose readiness mirrors the state. For external polling only.
    pub fn fd(&self) -> RawFd {
        self.event_fd.fd()
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    /// Move to `new_state`, adjusting the eventfd counter to the matching
    /// reserved value. A no-op if the state is unchanged.
    pub fn set_state(&mut self, new_state: ToggleState) -> Result<()> {
        if new_state == self.state {
            return Ok(());
        }
        let old_value = self.state.counter_value();
        let new_value = new_state.counter_value();
        if new_value > old_value {
            self.event_fd.write_u64(new_value - old_value)?;
        } else {
            // Going down means draining to zero first; the counter cannot
            // be decremented in place.
            self.event_fd.read_u64()?;
            if new_value > 0 {
                self.event_fd.write_u64(new_value)?;
            }
        }
        self.state = new_state;
        Ok(())
    }
}

impl std::fmt::Debug for ReadWriteToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadWriteToggle")
            .field("fd", &self.fd())
            .field("state", &self.state)
            .finish()
    }
}
