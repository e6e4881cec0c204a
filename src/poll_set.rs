//! A registration set over an epoll instance.

use std::cmp::max;
use std::ptr;

use crate::events::{Events, OnExec};
use crate::prelude::*;

/// Level or edge triggering for a registered fd.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Level,
    Edge,
}

/// Whether a registration keeps firing or disarms after one delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    Repeating,
    OneShot,
}

/// One delivered readiness event: the fd and the kinds it is ready for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollEvent {
    fd: RawFd,
    events: Events,
}

impl PollEvent {
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn events(&self) -> Events {
        self.events
    }
}

/// Owns one epoll handle and the set of fds registered with it.
///
/// `wait` blocks until at least one registered fd is ready, a timeout
/// expires, or forever; the delivered events are kept in kernel delivery
/// order and exposed through [`events`](PollSet::events) until the next
/// wait. A `PollSet` is not `Clone`; moving it transfers ownership of the
/// epoll handle.
pub struct PollSet {
    on_exec: OnExec,
    fd: RawFd,
    num_targets: u32,
    events: Vec<PollEvent>,
}

impl PollSet {
    /// Create a poll set with no registered fds.
    pub fn new(on_exec: OnExec) -> Result<PollSet> {
        let fd = create_epoll_fd(on_exec)?;
        Ok(PollSet {
            on_exec,
            fd,
            num_targets: 0,
            events: Vec::new(),
        })
    }

    /// Create a poll set with a single fd already registered.
    pub fn with_target(
        target: RawFd,
        events: Events,
        trigger: Trigger,
        repeat: Repeat,
        on_exec: OnExec,
    ) -> Result<PollSet> {
        let mut poll_set = PollSet::new(on_exec)?;
        poll_set.add(target, events, trigger, repeat)?;
        Ok(poll_set)
    }

    /// The epoll handle itself.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// The number of currently registered fds.
    pub fn num_targets(&self) -> u32 {
        self.num_targets
    }

    /// The events delivered by the last successful `wait`.
    pub fn events(&self) -> &[PollEvent] {
        &self.events
    }

    /// Register `target`. Fails with `EEXIST` if it is already registered.
    pub fn add(
        &mut self,
        target: RawFd,
        events: Events,
        trigger: Trigger,
        repeat: Repeat,
    ) -> Result<()> {
        let mut raw = raw_event(target, events, trigger, repeat);
        let ret = unsafe { libc::epoll_ctl(self.fd, libc::EPOLL_CTL_ADD, target, &mut raw) };
        if ret < 0 {
            match Errno::last() {
                EEXIST => return_errno!(EEXIST, "fd is already registered in the poll set"),
                errno => return Err(errno!(errno, "failed to add fd to the poll set")),
            }
        }
        self.num_targets += 1;
        Ok(())
    }

    /// Re-arm `target` with a new mask, trigger and repeat mode. Fails with
    /// `ENOENT` if it is not registered.
    pub fn modify(
        &mut self,
        target: RawFd,
        events: Events,
        trigger: Trigger,
        repeat: Repeat,
    ) -> Result<()> {
        let mut raw = raw_event(target, events, trigger, repeat);
        let ret = unsafe { libc::epoll_ctl(self.fd, libc::EPOLL_CTL_MOD, target, &mut raw) };
        if ret < 0 {
            match Errno::last() {
                ENOENT => return_errno!(ENOENT, "fd is not registered in the poll set"),
                errno => return Err(errno!(errno, "failed to modify fd in the poll set")),
            }
        }
        Ok(())
    }

    /// Unregister `target`. Fails with `ENOENT` if it is not registered.
    pub fn remove(&mut self, target: RawFd) -> Result<()> {
        let ret =
            unsafe { libc::epoll_ctl(self.fd, libc::EPOLL_CTL_DEL, target, ptr::null_mut()) };
        if ret < 0 {
            match Errno::last() {
                ENOENT => return_errno!(ENOENT, "fd is not registered in the poll set"),
                errno => return Err(errno!(errno, "failed to remove fd from the poll set")),
            }
        }
        self.num_targets -= 1;
        Ok(())
    }

    /// Drop every registration at once by replacing the epoll handle.
    pub fn clear(&mut self) -> Result<()> {
        let new_fd = create_epoll_fd(self.on_exec)?;
        let old_fd = std::mem::replace(&mut self.fd, new_fd);
        if old_fd >= 0 {
            let ret = unsafe { libc::close(old_fd) };
            debug_assert!(ret == 0);
        }
        self.num_targets = 0;
        self.events.clear();
        Ok(())
    }

    /// Block until at least one registered fd is ready or the timeout
    /// expires (`None` blocks indefinitely, a zero duration polls).
    ///
    /// `max_events == 0` sizes the result buffer from the current target
    /// count. Interruption by a signal is retried with the remaining time.
    /// Returns whether any event was delivered; the events themselves are
    /// available through [`events`](PollSet::events).
    pub fn wait(&mut self, timeout: Option<Duration>, max_events: usize) -> Result<bool> {
        let capacity = if max_events == 0 {
            max(self.num_targets as usize, 1)
        } else {
            max_events
        };
        let mut raw_events = vec![libc::epoll_event { events: 0, u64: 0 }; capacity];
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        let count = loop {
            let timeout_ms = match deadline {
                None => -1,
                Some(deadline) => remaining_ms(deadline),
            };
            let ret = unsafe {
                libc::epoll_wait(self.fd, raw_events.as_mut_ptr(), capacity as i32, timeout_ms)
            };
            if ret >= 0 {
                break ret as usize;
            }
            match Errno::last() {
                EINTR => continue,
                errno => return Err(errno!(errno, "epoll_wait on the poll set failed")),
            }
        };

        self.events.clear();
        for raw in raw_events[..count].iter() {
            self.events.push(PollEvent {
                fd: raw.u64 as RawFd,
                events: Events::from_raw(raw.events),
            });
        }
        Ok(count > 0)
    }

    /// Wait indefinitely, then hand the delivered events to `on_ready`.
    pub fn when_ready<R, F>(&mut self, max_events: usize, on_ready: F) -> Result<R>
    where
        F: FnOnce(&[PollEvent]) -> R,
    {
        self.wait(None, max_events)?;
        Ok(on_ready(&self.events))
    }

    /// Bounded variant of `when_ready`: `on_ready` runs if any event was
    /// delivered before the timeout, `on_timeout` otherwise.
    pub fn when_ready_or_timeout<R, F, G>(
        &mut self,
        timeout: Option<Duration>,
        max_events: usize,
        on_ready: F,
        on_timeout: G,
    ) -> Result<R>
    where
        F: FnOnce(&[PollEvent]) -> R,
        G: FnOnce() -> R,
    {
        if self.wait(timeout, max_events)? {
            Ok(on_ready(&self.events))
        } else {
            Ok(on_timeout())
        }
    }
}

impl Drop for PollSet {
    fn drop(&mut self) {
        if self.fd >= 0 {
            let ret = unsafe { libc::close(self.fd) };
            debug_assert!(ret == 0);
        }
    }
}

impl std::fmt::Debug for PollSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSet")
            .field("fd", &self.fd)
            .field("num_targets", &self.num_targets)
            .finish()
    }
}

fn create_epoll_fd(on_exec: OnExec) -> Result<RawFd> {
    let flags = match on_exec {
        OnExec::Close => libc::EPOLL_CLOEXEC,
        OnExec::Keep => 0,
    };
    let fd = try_libc!(libc::epoll_create1(flags));
    debug!("created epoll fd: fd = {}, on_exec = {:?}", fd, on_exec);
    Ok(fd)
}

fn raw_event(fd: RawFd, events: Events, trigger: Trigger, repeat: Repeat) -> libc::epoll_event {
    let mut raw = events.to_raw();
    if let Trigger::Edge = trigger {
        raw |= libc::EPOLLET as u32;
    }
    if let Repeat::OneShot = repeat {
        raw |= libc::EPOLLONESHOT as u32;
    }
    libc::epoll_event {
        events: raw,
        u64: fd as u64,
    }
}

/// Milliseconds until `deadline`, rounded up so an epoll wait never
/// returns ahead of it. Zero once the deadline has passed.
fn remaining_ms(deadline: Instant) -> libc::c_int {
    let now = Instant::now();
    if now >= deadline {
        return 0;
    }
    let remaining = deadline - now;
    let mut ms = remaining.as_millis();
    if remaining > Duration::from_millis(ms as u64) {
        ms += 1;
    }
    if ms > libc::c_int::MAX as u128 {
        libc::c_int::MAX
    } else {
        ms as libc::c_int
    }
}
