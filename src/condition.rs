//! A condition variable whose notifications can be polled.

use crate::events::OnExec;
use crate::prelude::*;
use crate::semaphore::Semaphore;

/// A pollable condition variable.
///
/// Beyond the classical `wait` / `notify_one` / `notify_all` surface, a
/// `Condition` supports *observers*: callers that obtain an fd through
/// [`observe`](Condition::observe), watch it in any poll set, and see it
/// become readable when a notification is delivered to them.
///
/// Internally every waiter and observer is represented by a *ticket*, an
/// anonymous [`Semaphore`] created at value zero. Notifying pops a ticket
/// off the waiter queue and ups it once; a blocked thread wakes from its
/// `down`, an observer's fd turns readable. Tickets are shared between the
/// waiter queue and the observer map, so whichever side lets go last frees
/// the eventfd.
///
/// The observer contract:
///
/// * After a notification the fd stays readable until the observer calls
///   [`ack`](Condition::ack), which consumes the notification and makes
///   the observer eligible for the next one. Acking an fd with no
///   outstanding notification blocks until one arrives.
/// * Between the notification and the matching `ack` the ticket is out of
///   the waiter queue, so one observer can never absorb two notifications
///   in a row.
/// * [`stop_observing`](Condition::stop_observing) returns the fd to the
///   condition. The observer must not touch the fd afterwards, and must
///   not perform *any* operation on it other than polling, `ack` and
///   `stop_observing` at any point. Forgetting to stop leaks the fd for
///   the condition's lifetime.
///
/// `notify_one` wakes the **most recently** enqueued ticket. That LIFO
/// order is deliberate and documented so callers may depend on it.
pub struct Condition {
    inner: Mutex<Inner>,
}

struct Inner {
    // Waiter queue: tickets eligible for the next notification, in enqueue
    // order. notify_one pops the back.
    queue: VecDeque<Arc<Semaphore>>,
    // Tickets handed out to observers, keyed by their eventfd.
    observers: HashMap<RawFd, Arc<Semaphore>>,
}

impl Inner {
    fn lookup(&self, fd: RawFd) -> Result<&Arc<Semaphore>> {
        match self.observers.get(&fd) {
            Some(ticket) => Ok(ticket),
            None => return_errno!(ENOENT, "fd is not observing this condition"),
        }
    }
}

impl Condition {
    pub fn new() -> Condition {
        Condition {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                observers: HashMap::new(),
            }),
        }
    }

    /// Block the calling thread until notified.
    pub fn wait(&self) -> Result<()> {
        let ticket = self.enqueue_ticket()?;
        ticket.down()
    }

    /// Block until notified or the timeout expires; true means notified.
    ///
    /// On timeout the ticket stays queued: a later notification spends
    /// itself on it harmlessly, and the ticket is freed once both the
    /// queue and this call have released it.
    pub fn wait_timeout(&self, timeout: Option<Duration>) -> Result<bool> {
        let ticket = self.enqueue_ticket()?;
        ticket.down_timeout(timeout)
    }

    /// Notify the most recently enqueued waiter or observer, if any.
    pub fn notify_one(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ticket) = inner.queue.pop_back() {
            ticket.up(1)?;
        }
        Ok(())
    }

    /// Notify every waiter and observer enqueued at this moment.
    pub fn notify_all(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        while let Some(ticket) = inner.queue.pop_back() {
            ticket.up(1)?;
        }
        Ok(())
    }

    /// Become an observer: returns an fd that turns readable when a
    /// notification is delivered to this observer.
    pub fn observe(&self) -> Result<RawFd> {
        let ticket = Arc::new(Semaphore::new(0, OnExec::Close)?);
        let fd = ticket.fd();
        let mut inner = self.inner.lock().unwrap();
        inner.queue.push_back(ticket.clone());
        inner.observers.insert(fd, ticket);
        Ok(fd)
    }

    /// Consume the outstanding notification on `fd` and re-arm it.
    ///
    /// Blocks until a notification has arrived if none is outstanding.
    /// Afterwards the fd is no longer readable and the observer is queued
    /// for the next notification. Fails with `ENOENT` if `fd` was not
    /// obtained from this condition's `observe`.
    pub fn ack(&self, fd: RawFd) -> Result<()> {
        let ticket = {
            let inner = self.inner.lock().unwrap();
            inner.lookup(fd)?.clone()
        };
        // The lock cannot be held across this down(): the notification may
        // not have been issued yet, and issuing it takes the lock.
        ticket.down()?;
        let mut inner = self.inner.lock().unwrap();
        inner.queue.push_back(ticket);
        Ok(())
    }

    /// Return `fd` to the condition. Fails with `ENOENT` if `fd` was not
    /// obtained from this condition's `observe` or was already returned.
    pub fn stop_observing(&self, fd: RawFd) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.observers.remove(&fd).is_none() {
            return_errno!(ENOENT, "fd is not observing this condition");
        }
        Ok(())
    }

    fn enqueue_ticket(&self) -> Result<Arc<Semaphore>> {
        let ticket = Arc::new(Semaphore::new(0, OnExec::Close)?);
        let mut inner = self.inner.lock().unwrap();
        inner.queue.push_back(ticket.clone());
        Ok(ticket)
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("Condition")
            .field("num_queued", &inner.queue.len())
            .field("num_observers", &inner.observers.len())
            .finish()
    }
}

/// Observes a [`Condition`] for the duration of a scope.
///
/// Construction calls [`Condition::observe`]; dropping the guard calls
/// [`Condition::stop_observing`], so the fd is returned on every exit
/// path.
pub struct ConditionGuard<'a> {
    condition: &'a Condition,
    fd: RawFd,
}

impl<'a> ConditionGuard<'a> {
    pub fn new(condition: &'a Condition) -> Result<ConditionGuard<'a>> {
        let fd = condition.observe()?;
        Ok(ConditionGuard { condition, fd })
    }

    /// True until [`stop`](ConditionGuard::stop) is called.
    pub fn active(&self) -> bool {
        self.fd >= 0
    }

    /// The observed fd, or a negative value once stopped.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Acknowledge the outstanding notification. See [`Condition::ack`].
    pub fn ack(&self) -> Result<()> {
        self.condition.ack(self.fd)
    }

    /// Stop observing now instead of at end of scope.
    pub fn stop(&mut self) -> Result<()> {
        if self.active() {
            let fd = std::mem::replace(&mut self.fd, -1);
            self.condition.stop_observing(fd)?;
        }
        Ok(())
    }
}

impl Drop for ConditionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("failed to stop observing a condition: {}", e);
        }
    }
}
