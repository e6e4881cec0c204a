//! A counting semaphore whose value can be observed with epoll.

use crate::event_fd::{EventFd, EventFdFlags};
use crate::events::{Events, OnExec};
use crate::poll_set::{PollSet, Repeat, Trigger};
use crate::prelude::*;

/// A counting semaphore backed by a semaphore-mode eventfd.
///
/// The eventfd counter *is* the semaphore value, so the fd exposed by
/// [`fd`](Semaphore::fd) is readable exactly while the value is positive
/// and writable while an `up` of one would not overflow `u64::MAX - 1`.
/// Callers polling that fd must never read or write it themselves; the
/// semaphore owns every byte that crosses it.
///
/// All operations take `&self`, so one instance can be shared across
/// threads behind an `Arc`.
pub struct Semaphore {
    event_fd: EventFd,
}

impl Semaphore {
    /// Create a semaphore with the given initial value.
    pub fn new(initial_value: u64, on_exec: OnExec) -> Result<Semaphore> {
        let mut flags = EventFdFlags::SEMAPHORE;
        if on_exec == OnExec::Close {
            flags |= EventFdFlags::CLOEXEC;
        }
        let event_fd = EventFd::new(initial_value, flags)?;
        Ok(Semaphore { event_fd })
    }

    /// The fd readable while the semaphore value is positive. For external
    /// polling only.
    pub fn fd(&self) -> RawFd {
        self.event_fd.fd()
    }

    /// Add `delta` to the semaphore value, blocking while the add would
    /// overflow.
    pub fn up(&self, delta: u64) -> Result<()> {
        while !self.event_fd.try_write_u64(delta)? {}
        Ok(())
    }

    /// Bounded `up`: true if the add completed before the timeout.
    pub fn up_timeout(&self, delta: u64, timeout: Option<Duration>) -> Result<bool> {
        let timeout = match timeout {
            None => {
                self.up(delta)?;
                return Ok(true);
            }
            Some(timeout) => timeout,
        };
        let mut poll_set = PollSet::with_target(
            self.fd(),
            Events::WRITE,
            Trigger::Level,
            Repeat::Repeating,
            OnExec::Close,
        )?;
        if !poll_set.wait(Some(timeout), 0)? {
            return Ok(false);
        }
        self.event_fd.write_u64(delta)?;
        Ok(true)
    }

    /// Remove one from the semaphore value, blocking while it is zero.
    pub fn down(&self) -> Result<()> {
        while self.event_fd.try_read_u64()?.is_none() {}
        Ok(())
    }

    /// Bounded `down`: true if a unit was taken before the timeout.
    pub fn down_timeout(&self, timeout: Option<Duration>) -> Result<bool> {
        let timeout = match timeout {
            None => {
                self.down()?;
                return Ok(true);
            }
            Some(timeout) => timeout,
        };
        let mut poll_set = PollSet::with_target(
            self.fd(),
            Events::READ,
            Trigger::Level,
            Repeat::Repeating,
            OnExec::Close,
        )?;
        if !poll_set.wait(Some(timeout), 0)? {
            return Ok(false);
        }
        self.event_fd.read_u64()?;
        Ok(true)
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("fd", &self.fd())
            .finish()
    }
}
