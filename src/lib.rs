//! Pollable synchronization primitives for Linux.
//!
//! A pollable primitive is a classical thread-synchronization object whose
//! state transitions are also visible as file-descriptor readiness, so that
//! event-driven code can fold it into a single multiplexed wait alongside
//! sockets, pipes and timers:
//!
//! * [`Semaphore`] is a counting semaphore backed by a semaphore-mode
//!   eventfd; its fd is readable exactly while the count is positive.
//! * [`ReadWriteToggle`] pins an eventfd into one of three readiness
//!   states (readable, writable, or both) under explicit control.
//! * [`Condition`] is a condition variable that can notify both blocked
//!   threads and observers watching a per-observer fd.
//! * [`Queue`] is a bounded FIFO publishing six state-transition events
//!   (empty, not-empty, full, not-full, high-water, low-water) through
//!   per-event conditions, plus a coarse has-items/has-space toggle.
//! * [`PollSet`] wraps an epoll instance for waiting on any of the above
//!   (or any other fd) in one call.
//!
//! The crate reports failures as [`Error`] values carrying the POSIX errno
//! of the underlying kernel call. It installs no logger and spawns no
//! threads; all blocking happens in kernel calls on the calling thread.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

mod prelude;
#[macro_use]
mod error;

mod condition;
mod event_fd;
mod events;
mod poll_set;
mod queue;
mod semaphore;
mod toggle;

pub use self::condition::{Condition, ConditionGuard};
pub use self::error::{Errno, Error, ErrorLocation, Result};
pub use self::event_fd::{EventFd, EventFdFlags};
pub use self::events::{Events, OnExec};
pub use self::poll_set::{PollEvent, PollSet, Repeat, Trigger};
pub use self::queue::{Queue, QueueEvent, QueueGuard};
pub use self::semaphore::Semaphore;
pub use self::toggle::{ReadWriteToggle, ToggleState};
