//! Owned wrapper over an eventfd handle.

use std::mem;

use crate::prelude::*;

bitflags! {
    pub struct EventFdFlags: i32 {
        /// Reads decrement the counter by one instead of draining it.
        const SEMAPHORE = libc::EFD_SEMAPHORE;
        /// Non-blocking reads and writes.
        const NONBLOCK  = libc::EFD_NONBLOCK;
        /// Close on exec.
        const CLOEXEC   = libc::EFD_CLOEXEC;
    }
}

/// An eventfd: a kernel counter manipulated through 8-byte reads and writes.
///
/// The counter stays within `0 ..= u64::MAX - 1`. The fd is readable while
/// the counter is positive and writable while an add of one more would not
/// overflow that range. The handle is closed on drop.
pub struct EventFd {
    fd: RawFd,
}

impl EventFd {
    pub fn new(init_val: u64, flags: EventFdFlags) -> Result<EventFd> {
        if init_val > u64::MAX - 1 {
            return_errno!(EINVAL, "initial value is too big");
        }
        let fd = try_libc!(libc::eventfd(0, flags.bits()));
        debug!("created eventfd: fd = {}, flags = {:?}", fd, flags);

        // eventfd(2) only takes a 32-bit initial value; seed larger values
        // through a write, which adds to the fresh zero counter.
        let event_fd = EventFd { fd };
        if init_val > 0 {
            event_fd.write_u64(init_val)?;
        }
        Ok(event_fd)
    }

    /// Read the fd, blocking per its flags. In semaphore mode the result is
    /// always one; otherwise it is the drained counter value.
    pub fn read_u64(&self) -> Result<u64> {
        let mut val: u64 = 0;
        let nread = try_libc!(libc::read(
            self.fd,
            &mut val as *mut u64 as *mut libc::c_void,
            mem::size_of::<u64>(),
        ));
        if nread as usize != mem::size_of::<u64>() {
            return_errno!(EIO, "short read from eventfd");
        }
        Ok(val)
    }

    /// Like `read_u64`, but report a counter at zero (`EAGAIN`) as `None`
    /// instead of an error.
    pub fn try_read_u64(&self) -> Result<Option<u64>> {
        let mut val: u64 = 0;
        let nread = unsafe {
            libc::read(
                self.fd,
                &mut val as *mut u64 as *mut libc::c_void,
                mem::size_of::<u64>(),
            )
        };
        if nread < 0 {
            match Errno::last() {
                EAGAIN => return Ok(None),
                errno => return Err(errno!(errno, "failed to read from eventfd")),
            }
        }
        if nread as usize != mem::size_of::<u64>() {
            return_errno!(EIO, "short read from eventfd");
        }
        Ok(Some(val))
    }

    /// Add `val` to the counter, blocking per the fd's flags.
    pub fn write_u64(&self, val: u64) -> Result<()> {
        let nwritten = try_libc!(libc::write(
            self.fd,
            &val as *const u64 as *const libc::c_void,
            mem::size_of::<u64>(),
        ));
        if nwritten as usize != mem::size_of::<u64>() {
            return_errno!(EIO, "short write to eventfd");
        }
        Ok(())
    }

    /// Like `write_u64`, but report a full counter (`EAGAIN`) as `false`
    /// instead of an error.
    pub fn try_write_u64(&self, val: u64) -> Result<bool> {
        let nwritten = unsafe {
            libc::write(
                self.fd,
                &val as *const u64 as *const libc::c_void,
                mem::size_of::<u64>(),
            )
        };
        if nwritten < 0 {
            match Errno::last() {
                EAGAIN => return Ok(false),
                errno => return Err(errno!(errno, "failed to write to eventfd")),
            }
        }
        if nwritten as usize != mem::size_of::<u64>() {
            return_errno!(EIO, "short write to eventfd");
        }
        Ok(true)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for EventFd {
    fn drop(&mut self) {
        let ret = unsafe { libc::close(self.fd) };
        debug_assert!(ret == 0);
    }
}

impl std::fmt::Debug for EventFd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFd").field("fd", &self.fd).finish()
    }
}
