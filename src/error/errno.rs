use std::fmt;

/// POSIX errno values, mirrored as an enum so call sites can match on the
/// kind of a failure without touching raw integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Errno {
    EUNKNOWN = 0,
    EPERM = libc::EPERM,
    ENOENT = libc::ENOENT,
    EINTR = libc::EINTR,
    EIO = libc::EIO,
    EBADF = libc::EBADF,
    EAGAIN = libc::EAGAIN,
    ENOMEM = libc::ENOMEM,
    EACCES = libc::EACCES,
    EFAULT = libc::EFAULT,
    EBUSY = libc::EBUSY,
    EEXIST = libc::EEXIST,
    EINVAL = libc::EINVAL,
    ENFILE = libc::ENFILE,
    EMFILE = libc::EMFILE,
    ENOSPC = libc::ENOSPC,
    EPIPE = libc::EPIPE,
    EDEADLK = libc::EDEADLK,
    ENOSYS = libc::ENOSYS,
    ELOOP = libc::ELOOP,
    ETIMEDOUT = libc::ETIMEDOUT,
    EOVERFLOW = libc::EOVERFLOW,
}

impl Errno {
    /// Translate a raw OS errno. Codes this crate has no business seeing
    /// collapse to `EUNKNOWN`; the raw value is still visible to callers
    /// through the containing I/O error they started from.
    pub fn from_raw(raw: i32) -> Errno {
        match raw {
            libc::EPERM => Errno::EPERM,
            libc::ENOENT => Errno::ENOENT,
            libc::EINTR => Errno::EINTR,
            libc::EIO => Errno::EIO,
            libc::EBADF => Errno::EBADF,
            libc::EAGAIN => Errno::EAGAIN,
            libc::ENOMEM => Errno::ENOMEM,
            libc::EACCES => Errno::EACCES,
            libc::EFAULT => Errno::EFAULT,
            libc::EBUSY => Errno::EBUSY,
            libc::EEXIST => Errno::EEXIST,
            libc::EINVAL => Errno::EINVAL,
            libc::ENFILE => Errno::ENFILE,
            libc::EMFILE => Errno::EMFILE,
            libc::ENOSPC => Errno::ENOSPC,
            libc::EPIPE => Errno::EPIPE,
            libc::EDEADLK => Errno::EDEADLK,
            libc::ENOSYS => Errno::ENOSYS,
            libc::ELOOP => Errno::ELOOP,
            libc::ETIMEDOUT => Errno::ETIMEDOUT,
            libc::EOVERFLOW => Errno::EOVERFLOW,
            _ => Errno::EUNKNOWN,
        }
    }

    /// The errno of the last failed libc call on this thread.
    pub fn last() -> Errno {
        let raw = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        Errno::from_raw(raw)
    }

    pub fn as_raw(&self) -> i32 {
        *self as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Errno::EUNKNOWN => "Unknown error",
            Errno::EPERM => "Operation not permitted",
            Errno::ENOENT => "No such file or directory",
            Errno::EINTR => "Interrupted system call",
            Errno::EIO => "I/O error",
            Errno::EBADF => "Bad file number",
            Errno::EAGAIN => "Try again",
            Errno::ENOMEM => "Out of memory",
            Errno::EACCES => "Permission denied",
            Errno::EFAULT => "Bad address",
            Errno::EBUSY => "Device or resource busy",
            Errno::EEXIST => "File exists",
            Errno::EINVAL => "Invalid argument",
            Errno::ENFILE => "File table overflow",
            Errno::EMFILE => "Too many open files",
            Errno::ENOSPC => "No space left on device",
            Errno::EPIPE => "Broken pipe",
            Errno::EDEADLK => "Resource deadlock would occur",
            Errno::ENOSYS => "Function not implemented",
            Errno::ELOOP => "Too many symbolic links encountered",
            Errno::ETIMEDOUT => "Connection timed out",
            Errno::EOVERFLOW => "Value too large for defined data type",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} (#{}, {})", self, self.as_raw(), self.as_str())
    }
}
