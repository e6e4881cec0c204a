//! Readiness-event kinds and fd creation modes.

bitflags! {
    /// The kinds of fd readiness a [`PollSet`](crate::PollSet) can watch
    /// and report.
    ///
    /// The set is closed under union, intersection and complement; the
    /// complement stays within the six defined bits.
    #[rustfmt::skip]
    pub struct Events: u32 {
        const READ        = 0x01;
        const WRITE       = 0x02;
        const READ_HANGUP = 0x04;
        const HANGUP      = 0x08;
        const PRIORITY    = 0x10;
        const ERROR       = 0x20;
    }
}

impl Events {
    const RAW_PAIRS: [(u32, Events); 6] = [
        (libc::EPOLLIN as u32, Events::READ),
        (libc::EPOLLOUT as u32, Events::WRITE),
        (libc::EPOLLRDHUP as u32, Events::READ_HANGUP),
        (libc::EPOLLHUP as u32, Events::HANGUP),
        (libc::EPOLLPRI as u32, Events::PRIORITY),
        (libc::EPOLLERR as u32, Events::ERROR),
    ];

    /// The `EPOLL*` bit pattern equivalent to this set.
    pub fn to_raw(self) -> u32 {
        let mut raw = 0;
        for &(raw_bit, kind) in Self::RAW_PAIRS.iter() {
            if self.contains(kind) {
                raw |= raw_bit;
            }
        }
        raw
    }

    /// Translate kernel-reported `EPOLL*` bits. Bits outside the six
    /// supported kinds are dropped.
    pub fn from_raw(raw: u32) -> Events {
        let mut events = Events::empty();
        for &(raw_bit, kind) in Self::RAW_PAIRS.iter() {
            if raw & raw_bit != 0 {
                events |= kind;
            }
        }
        events
    }
}

/// Whether a kernel handle survives `exec`.
///
/// `Close` requests the close-on-exec flag at creation time, so the handle
/// never leaks into a replacement program image; `Keep` propagates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnExec {
    Keep,
    Close,
}
