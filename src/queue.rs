//! A bounded FIFO whose state transitions can be polled.

use crate::condition::Condition;
use crate::events::OnExec;
use crate::prelude::*;
use crate::toggle::{ReadWriteToggle, ToggleState};

/// The queue-state transitions that can be waited for or observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueEvent {
    /// The queue went from holding items to holding none.
    Empty,
    /// The queue went from holding nothing to holding items.
    NotEmpty,
    /// The queue reached its maximum size.
    Full,
    /// The queue came back down from its maximum size.
    NotFull,
    /// The size climbed above the high water mark. Re-arms only after the
    /// size has fallen back to the low water mark.
    HighWaterMark,
    /// The size fell to the low water mark after a high-water crossing.
    LowWaterMark,
}

struct State<T> {
    items: VecDeque<T>,
    low_water_mark: usize,
    high_water_mark: usize,
    // Hysteresis latch: set when the size climbs above the high water
    // mark, cleared when it falls back to the low water mark. Both
    // water-mark events consult it, so it lives here, under the one lock.
    high_water_crossed: bool,
    toggle: ReadWriteToggle,
}

/// A bounded FIFO that publishes its state transitions as pollable events.
///
/// Each [`QueueEvent`] has its own [`Condition`]: threads block on it with
/// [`wait`](Queue::wait), observers watch it through
/// [`observe`](Queue::observe) / [`ack`](Queue::ack) /
/// [`stop_observing`](Queue::stop_observing). Independently,
/// [`queue_state_fd`](Queue::queue_state_fd) exposes a level-triggered fd
/// that is readable while the queue has items and writable while it has
/// space — the steady state rather than the edges.
///
/// The two water-mark events form a hysteresis pair: after a high-water
/// crossing fires, a second one is not reported until the size has first
/// fallen to the low water mark, and the low-water event only fires after
/// an intervening high-water crossing.
pub struct Queue<T> {
    max_size: usize,
    state: Mutex<State<T>>,
    empty_cv: Condition,
    not_empty_cv: Condition,
    full_cv: Condition,
    not_full_cv: Condition,
    high_water_cv: Condition,
    low_water_cv: Condition,
}

impl<T> Queue<T> {
    /// A queue bounded only by `usize::MAX`.
    pub fn unbounded() -> Result<Queue<T>> {
        Queue::bounded(usize::MAX)
    }

    /// A queue holding at most `max_size` items, with both water marks at
    /// the maximum (so the water-mark events never fire).
    pub fn bounded(max_size: usize) -> Result<Queue<T>> {
        Queue::with_water_marks(max_size, max_size, max_size)
    }

    /// A queue holding at most `max_size` items with backpressure
    /// thresholds. Fails with `EINVAL` unless
    /// `low_water_mark <= high_water_mark <= max_size`.
    pub fn with_water_marks(
        max_size: usize,
        low_water_mark: usize,
        high_water_mark: usize,
    ) -> Result<Queue<T>> {
        if high_water_mark > max_size {
            return_errno!(EINVAL, "high water mark exceeds the maximum size");
        }
        if low_water_mark > high_water_mark {
            return_errno!(EINVAL, "low water mark exceeds the high water mark");
        }
        let mut toggle = ReadWriteToggle::new(OnExec::Close)?;
        toggle.set_state(ToggleState::WriteOnly)?;
        Ok(Queue {
            max_size,
            state: Mutex::new(State {
                items: VecDeque::new(),
                low_water_mark,
                high_water_mark,
                high_water_crossed: false,
                toggle,
            }),
            empty_cv: Condition::new(),
            not_empty_cv: Condition::new(),
            full_cv: Condition::new(),
            not_full_cv: Condition::new(),
            high_water_cv: Condition::new(),
            low_water_cv: Condition::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn low_water_mark(&self) -> usize {
        self.state.lock().unwrap().low_water_mark
    }

    pub fn high_water_mark(&self) -> usize {
        self.state.lock().unwrap().high_water_mark
    }

    pub fn above_high_water_mark(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.items.len() > state.high_water_mark
    }

    pub fn at_or_below_low_water_mark(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.items.len() <= state.low_water_mark
    }

    /// Fails with `EINVAL` if `value` exceeds the high water mark.
    pub fn set_low_water_mark(&self, value: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if value > state.high_water_mark {
            return_errno!(EINVAL, "low water mark exceeds the high water mark");
        }
        state.low_water_mark = value;
        Ok(())
    }

    /// Fails with `EINVAL` if `value` exceeds the maximum size or falls
    /// below the low water mark.
    pub fn set_high_water_mark(&self, value: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if value > self.max_size {
            return_errno!(EINVAL, "high water mark exceeds the maximum size");
        }
        if value < state.low_water_mark {
            return_errno!(EINVAL, "high water mark falls below the low water mark");
        }
        state.high_water_mark = value;
        Ok(())
    }

    /// Dequeue the front item, blocking while the queue is empty.
    pub fn get(&self) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                let old_size = state.items.len() + 1;
                self.issue_notifications(&mut state, old_size, old_size - 1)?;
                return Ok(item);
            }
            let (next, _) = self.wait_for(state, &self.not_empty_cv, None, |s| {
                !s.items.is_empty()
            })?;
            state = next;
        }
    }

    /// Bounded `get`: `None` blocks like [`get`](Queue::get), a zero
    /// duration tries once without blocking, anything else waits out the
    /// deadline. Returns `None` if the queue stayed empty.
    pub fn get_timeout(&self, timeout: Option<Duration>) -> Result<Option<T>> {
        let timeout = match timeout {
            None => return self.get().map(Some),
            Some(timeout) => timeout,
        };
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                let old_size = state.items.len() + 1;
                self.issue_notifications(&mut state, old_size, old_size - 1)?;
                return Ok(Some(item));
            }
            let (next, have_time) = self.wait_for(state, &self.not_empty_cv, Some(deadline), |s| {
                !s.items.is_empty()
            })?;
            state = next;
            if !have_time && state.items.is_empty() {
                return Ok(None);
            }
        }
    }

    /// Move the entire contents out atomically.
    pub fn get_all(&self) -> Result<VecDeque<T>> {
        let mut state = self.state.lock().unwrap();
        let items = std::mem::take(&mut state.items);
        self.issue_notifications(&mut state, items.len(), 0)?;
        Ok(items)
    }

    /// Enqueue `item`, blocking while the queue is full.
    pub fn put(&self, item: T) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.items.len() < self.max_size {
                self.push(&mut state, item)?;
                return Ok(());
            }
            let max_size = self.max_size;
            let (next, _) = self.wait_for(state, &self.not_full_cv, None, move |s| {
                s.items.len() < max_size
            })?;
            state = next;
        }
    }

    /// Bounded `put`; the timeout reads like
    /// [`get_timeout`](Queue::get_timeout)'s. On timeout the item is
    /// handed back to the caller.
    pub fn put_timeout(&self, item: T, timeout: Option<Duration>) -> Result<Option<T>> {
        let timeout = match timeout {
            None => return self.put(item).map(|_| None),
            Some(timeout) => timeout,
        };
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            if state.items.len() < self.max_size {
                self.push(&mut state, item)?;
                return Ok(None);
            }
            let max_size = self.max_size;
            let (next, have_time) =
                self.wait_for(state, &self.not_full_cv, Some(deadline), move |s| {
                    s.items.len() < max_size
                })?;
            state = next;
            if !have_time && state.items.len() >= self.max_size {
                return Ok(Some(item));
            }
        }
    }

    /// Drop every queued item, firing the same notifications a drain to
    /// zero would.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let old_size = state.items.len();
        state.items.clear();
        self.issue_notifications(&mut state, old_size, 0)
    }

    /// Block until `event`'s transition has occurred or the timeout
    /// expires; true means it occurred.
    pub fn wait(&self, event: QueueEvent, timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let max_size = self.max_size;
        let state = self.state.lock().unwrap();
        let (_state, occurred) = match event {
            QueueEvent::Empty => {
                self.wait_for(state, &self.empty_cv, deadline, |s| s.items.is_empty())?
            }
            QueueEvent::NotEmpty => {
                self.wait_for(state, &self.not_empty_cv, deadline, |s| !s.items.is_empty())?
            }
            QueueEvent::Full => self.wait_for(state, &self.full_cv, deadline, move |s| {
                s.items.len() >= max_size
            })?,
            QueueEvent::NotFull => self.wait_for(state, &self.not_full_cv, deadline, move |s| {
                s.items.len() < max_size
            })?,
            QueueEvent::HighWaterMark => {
                // Phase one: the latch must clear, which happens when the
                // size falls to the low water mark. Phase two: the actual
                // crossing. Both phases share the deadline, so each wait
                // sees only the remaining time.
                let (state, armed) =
                    self.wait_for(state, &self.low_water_cv, deadline, |s| !s.high_water_crossed)?;
                if !armed {
                    (state, false)
                } else {
                    self.wait_for(state, &self.high_water_cv, deadline, |s| {
                        s.items.len() > s.high_water_mark
                    })?
                }
            }
            QueueEvent::LowWaterMark => {
                let (state, armed) =
                    self.wait_for(state, &self.high_water_cv, deadline, |s| s.high_water_crossed)?;
                if !armed {
                    (state, false)
                } else {
                    self.wait_for(state, &self.low_water_cv, deadline, |s| {
                        s.items.len() <= s.low_water_mark
                    })?
                }
            }
        };
        Ok(occurred)
    }

    /// Become an observer of `event`. See [`Condition::observe`].
    pub fn observe(&self, event: QueueEvent) -> Result<RawFd> {
        self.select_cv(event).observe()
    }

    /// Acknowledge a notification on an fd obtained from
    /// [`observe`](Queue::observe) with the same `event`.
    pub fn ack(&self, fd: RawFd, event: QueueEvent) -> Result<()> {
        self.select_cv(event).ack(fd)
    }

    /// Return an fd obtained from [`observe`](Queue::observe).
    pub fn stop_observing(&self, fd: RawFd, event: QueueEvent) -> Result<()> {
        self.select_cv(event).stop_observing(fd)
    }

    /// The level-triggered state fd: readable while the queue has items,
    /// writable while it has space. For external polling only.
    pub fn queue_state_fd(&self) -> RawFd {
        self.state.lock().unwrap().toggle.fd()
    }

    fn select_cv(&self, event: QueueEvent) -> &Condition {
        match event {
            QueueEvent::Empty => &self.empty_cv,
            QueueEvent::NotEmpty => &self.not_empty_cv,
            QueueEvent::Full => &self.full_cv,
            QueueEvent::NotFull => &self.not_full_cv,
            QueueEvent::HighWaterMark => &self.high_water_cv,
            QueueEvent::LowWaterMark => &self.low_water_cv,
        }
    }

    fn push(&self, state: &mut State<T>, item: T) -> Result<()> {
        state.items.push_back(item);
        let new_size = state.items.len();
        self.issue_notifications(state, new_size - 1, new_size)
    }

    /// Fire the event conditions whose transition predicate holds for
    /// `(old_size, new_size)` and re-point the state toggle. Runs under
    /// the queue lock; each condition takes its own lock briefly.
    fn issue_notifications(
        &self,
        state: &mut State<T>,
        old_size: usize,
        new_size: usize,
    ) -> Result<()> {
        let max_size = self.max_size;
        if old_size == 0 && new_size > 0 {
            self.not_empty_cv.notify_all()?;
        }
        if old_size > 0 && new_size == 0 {
            self.empty_cv.notify_all()?;
        }
        if old_size >= max_size && new_size < max_size {
            self.not_full_cv.notify_all()?;
        }
        if old_size < max_size && new_size >= max_size {
            self.full_cv.notify_all()?;
        }
        if old_size <= state.high_water_mark
            && new_size > state.high_water_mark
            && !state.high_water_crossed
        {
            self.high_water_cv.notify_all()?;
            state.high_water_crossed = true;
        }
        if old_size > state.low_water_mark
            && new_size <= state.low_water_mark
            && state.high_water_crossed
        {
            self.low_water_cv.notify_all()?;
            state.high_water_crossed = false;
        }

        let target = if new_size == 0 {
            ToggleState::WriteOnly
        } else if new_size >= max_size {
            ToggleState::ReadOnly
        } else {
            ToggleState::ReadWrite
        };
        state.toggle.set_state(target)
    }

    /// The wait loop every blocking operation shares: while the predicate
    /// is false, release the queue lock, block on the condition, retake
    /// the lock and re-check. The boolean reports the predicate's final
    /// value; with a deadline it may be false.
    fn wait_for<'a, P>(
        &'a self,
        mut state: MutexGuard<'a, State<T>>,
        condition: &Condition,
        deadline: Option<Instant>,
        pred: P,
    ) -> Result<(MutexGuard<'a, State<T>>, bool)>
    where
        P: Fn(&State<T>) -> bool,
    {
        loop {
            if pred(&state) {
                return Ok((state, true));
            }
            let timeout = match deadline {
                None => None,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok((state, false));
                    }
                    Some(deadline - now)
                }
            };
            drop(state);
            let notified = condition.wait_timeout(timeout)?;
            state = self.state.lock().unwrap();
            if !notified {
                let satisfied = pred(&state);
                return Ok((state, satisfied));
            }
        }
    }
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("Queue")
            .field("len", &state.items.len())
            .field("max_size", &self.max_size)
            .field("low_water_mark", &state.low_water_mark)
            .field("high_water_mark", &state.high_water_mark)
            .field("high_water_crossed", &state.high_water_crossed)
            .finish()
    }
}

/// Observes one [`QueueEvent`] of a [`Queue`] for the duration of a scope.
pub struct QueueGuard<'a, T> {
    queue: &'a Queue<T>,
    event: QueueEvent,
    fd: RawFd,
}

impl<'a, T> QueueGuard<'a, T> {
    pub fn new(queue: &'a Queue<T>, event: QueueEvent) -> Result<QueueGuard<'a, T>> {
        let fd = queue.observe(event)?;
        Ok(QueueGuard { queue, event, fd })
    }

    /// True until [`stop`](QueueGuard::stop) is called.
    pub fn active(&self) -> bool {
        self.fd >= 0
    }

    /// The observed fd, or a negative value once stopped.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn event(&self) -> QueueEvent {
        self.event
    }

    /// Acknowledge the outstanding notification. See [`Queue::ack`].
    pub fn ack(&self) -> Result<()> {
        self.queue.ack(self.fd, self.event)
    }

    /// Stop observing now instead of at end of scope.
    pub fn stop(&mut self) -> Result<()> {
        if self.active() {
            let fd = std::mem::replace(&mut self.fd, -1);
            self.queue.stop_observing(fd, self.event)?;
        }
        Ok(())
    }
}

impl<T> Drop for QueueGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("failed to stop observing a queue event: {}", e);
        }
    }
}
