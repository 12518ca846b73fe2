//! Pending-event flags shared between a backend thread and the caller.
//!
//! The caller raises a flag before issuing a blocking query; the backend
//! thread clears it when the matching event arrives. Waiting is done on a
//! condition variable instead of sleeping in a loop.

use crate::error::{Error, Result};
use bitflags::bitflags;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

bitflags! {
    /// Queries that are waiting for the backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pending: u8 {
        /// A mouse sample was requested and has not arrived.
        const MOUSE = 0b01;
        /// A frame tick was requested and has not arrived.
        const FRAME = 0b10;
    }
}

#[derive(Debug, Default)]
struct State {
    pending: Pending,
    mouse: (i32, i32),
    /// Number of mouse samples recorded so far.
    samples: u64,
    /// Replies still in flight for queries that timed out.
    owed_replies: u32,
    /// Set once the producing thread is gone.
    closed: bool,
}

/// Outstanding-query flags plus the latest mouse sample.
#[derive(Debug, Default)]
pub struct Signals {
    state: Mutex<State>,
    cond: Condvar,
}

impl Signals {
    /// Create with nothing pending and the mouse at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `flags` as outstanding.
    pub fn raise(&self, flags: Pending) {
        self.lock().pending.insert(flags);
    }

    /// Clear `flags` and wake waiters.
    pub fn clear(&self, flags: Pending) {
        self.lock().pending.remove(flags);
        self.cond.notify_all();
    }

    /// Store a mouse sample and satisfy any outstanding mouse query.
    ///
    /// A late reply to a query that already timed out is dropped.
    pub fn record_mouse(&self, x: i32, y: i32) {
        let mut state = self.lock();
        if state.owed_replies > 0 {
            state.owed_replies -= 1;
            return;
        }
        state.mouse = (x, y);
        state.samples += 1;
        state.pending.remove(Pending::MOUSE);
        drop(state);
        self.cond.notify_all();
    }

    /// Flags currently outstanding.
    pub fn pending(&self) -> Pending {
        self.lock().pending
    }

    /// Latest mouse sample.
    pub fn mouse(&self) -> (i32, i32) {
        self.lock().mouse
    }

    /// How many mouse samples have been recorded.
    pub fn samples(&self) -> u64 {
        self.lock().samples
    }

    /// Wake every waiter with [`Error::Disconnected`] from now on.
    pub fn close(&self) {
        self.lock().closed = true;
        self.cond.notify_all();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Block until none of `flags` is outstanding.
    ///
    /// On failure the flags are withdrawn.
    pub fn wait_cleared(&self, flags: Pending, timeout: Option<Duration>) -> Result<()> {
        let (mut state, result) = self.wait_until(timeout, |state| !state.pending.intersects(flags));
        if result.is_err() {
            state.pending.remove(flags);
        }
        result
    }

    /// Block for the reply to an outstanding mouse query and return it.
    ///
    /// A query that times out still has a reply in flight. That reply is
    /// discarded when it arrives, so it cannot answer the next query.
    pub fn wait_mouse_reply(&self, timeout: Option<Duration>) -> Result<(i32, i32)> {
        let (mut state, result) =
            self.wait_until(timeout, |state| !state.pending.contains(Pending::MOUSE));
        match result {
            Ok(()) => Ok(state.mouse),
            Err(e) => {
                state.pending.remove(Pending::MOUSE);
                if matches!(e, Error::Timeout) {
                    state.owed_replies += 1;
                }
                Err(e)
            }
        }
    }

    /// Block until at least one mouse sample exists, then return the latest.
    pub fn wait_any_sample(&self, timeout: Option<Duration>) -> Result<(i32, i32)> {
        let (state, result) = self.wait_until(timeout, |state| state.samples > 0);
        result.map(|()| state.mouse)
    }

    /// Wait on the condition variable until `ready` holds, the signals are
    /// closed, or the deadline passes. The lock is handed back either way.
    fn wait_until(
        &self,
        timeout: Option<Duration>,
        ready: impl Fn(&State) -> bool,
    ) -> (MutexGuard<'_, State>, Result<()>) {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();
        loop {
            if ready(&state) {
                return (state, Ok(()));
            }
            if state.closed {
                return (state, Err(Error::Disconnected));
            }
            state = match deadline {
                None => self.cond.wait(state).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return (state, Err(Error::Timeout));
                    }
                    self.cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

/// Closes a [`Signals`] when dropped, including while a thread unwinds.
///
/// Producer threads hold one for their whole run so that waiters are
/// released even if an input callback panics.
#[derive(Debug)]
pub struct CloseOnDrop(pub Arc<Signals>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}
