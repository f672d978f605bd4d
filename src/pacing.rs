//! Suspension and time: everything the update loops wait on or read the time from.
//!
//! [`Context`] provides a cancellation, similar to Golang's Context, and is the
//! [`Pacer`] the binary runs with. Tests substitute pacers and clocks that do
//! not sleep.

use std::{
    ops::Deref,
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

use chrono::{DateTime, FixedOffset, Local};

/// Outcome of a suspension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Hold {
    /// The full duration passed.
    Elapsed,
    /// The run was cancelled; the caller should wind down.
    Cancelled,
}

/// Suspends the caller between updates.
pub trait Pacer {
    fn hold(&mut self, duration: Duration) -> Hold;
}

/// Source of wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system clock, in the system's local offset.
#[derive(Debug, Default, Copy, Clone)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a new Context.
    pub fn new() -> Self {
        Context {
            inner: Arc::new(ContextInner::new()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Context {
    type Target = ContextInner;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl Pacer for Context {
    fn hold(&mut self, duration: Duration) -> Hold {
        if self.wait_timeout(duration) {
            Hold::Cancelled
        } else {
            Hold::Elapsed
        }
    }
}

#[derive(Debug)]
pub struct ContextInner {
    cancelled: Mutex<bool>,
    cv: Condvar,
}

impl ContextInner {
    fn new() -> Self {
        ContextInner {
            cancelled: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Cancel the context, waking any pending hold.
    pub fn cancel(&self) {
        let mut g = self.cancelled.lock().unwrap();
        *g = true;
        self.cv.notify_all();
    }

    /// Returns true iff the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock().unwrap()
    }

    /// Wait until the duration expires, or the context is cancelled.
    /// Returns true if the context has been cancelled.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let g = self.cancelled.lock().unwrap();
        let (v, _) = self.cv.wait_timeout_while(g, duration, |g| !*g).unwrap();
        *v
    }
}

/// A pacer that never sleeps. Records every hold it was asked for, and
/// reports cancellation once `budget` holds have elapsed.
#[derive(Debug, Default, Clone)]
pub struct CountingPacer {
    pub holds: Vec<Duration>,
    budget: Option<usize>,
}

impl CountingPacer {
    /// A pacer that never cancels.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A pacer that cancels on the hold after the `n`th.
    pub fn cancel_after(n: usize) -> Self {
        CountingPacer {
            holds: Vec::new(),
            budget: Some(n),
        }
    }
}

impl Pacer for CountingPacer {
    fn hold(&mut self, duration: Duration) -> Hold {
        if let Some(budget) = self.budget {
            if self.holds.len() >= budget {
                return Hold::Cancelled;
            }
        }
        self.holds.push(duration);
        Hold::Elapsed
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Copy, Clone)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
