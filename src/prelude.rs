pub(crate) use std::collections::{HashMap, VecDeque};
pub(crate) use std::os::unix::io::RawFd;
pub(crate) use std::sync::{Arc, Mutex, MutexGuard};
pub(crate) use std::time::{Duration, Instant};

pub(crate) use crate::error::Errno::{self, *};
pub(crate) use crate::error::Result;
