//! Errno-centric error handling.
//!
//! Every failure this crate reports carries the POSIX errno of the kernel
//! call (or validation rule) that produced it, a static message, and the
//! source location that raised it. Registration-style failures reuse the
//! kernel's own vocabulary: adding a present fd is `EEXIST`, touching an
//! absent one is `ENOENT`, rejected parameters are `EINVAL`.

use std::fmt;

mod errno;

pub use self::errno::Errno;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    errno: Errno,
    msg: &'static str,
    location: Option<ErrorLocation>,
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorLocation {
    line: u32,
    file: &'static str,
}

impl Error {
    pub fn embedded(inner: (Errno, &'static str), location: Option<ErrorLocation>) -> Error {
        Error {
            errno: inner.0,
            msg: inner.1,
            location,
        }
    }

    pub fn errno(&self) -> Errno {
        self.errno
    }

    pub fn message(&self) -> &'static str {
        self.msg
    }
}

impl ErrorLocation {
    pub fn new(file: &'static str, line: u32) -> ErrorLocation {
        ErrorLocation { file, line }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.errno, self.msg)?;
        if let Some(location) = self.location {
            write!(f, " {}", location)?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[line = {}, file = {}]", self.line, self.file)
    }
}

impl std::error::Error for Error {}

macro_rules! errno {
    ($errno_expr: expr, $error_msg: expr) => {{
        let inner_error = {
            let errno: crate::error::Errno = $errno_expr;
            let msg: &'static str = $error_msg;
            (errno, msg)
        };
        crate::error::Error::embedded(
            inner_error,
            Some(crate::error::ErrorLocation::new(file!(), line!())),
        )
    }};
}

macro_rules! return_errno {
    ($errno_expr: expr, $error_msg: expr) => {{
        return Err(errno!($errno_expr, $error_msg));
    }};
}

// return Err(errno) if libc returns -1
macro_rules! try_libc {
    ($ret: expr) => {{
        let ret = unsafe { $ret };
        if ret < 0 {
            return_errno!(crate::error::Errno::last(), "libc error");
        }
        ret
    }};
}
