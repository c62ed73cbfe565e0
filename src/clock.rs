//! Time sources used to age ARP entries

use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

/// A monotonic time source
///
/// Expiry in the stack is evaluated lazily, every lookup asks the clock for
/// the current time and compares it against the time the entry was stored.
pub trait Clock {
    /// The current time
    fn now(&self) -> Instant;
}

/// The wall clock, backed by [`Instant::now`]
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle while the stack
/// owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    /// Creates a clock frozen at the current time
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    /// Moves the clock forward
    #[inline]
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Instant {
        self.now.get()
    }
}
