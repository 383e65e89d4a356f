//! A small clock abstraction that lets the ARP cache's second-granularity
//! TTL/retransmit policy be driven by a real clock in production and by a
//! frozen, manually-advanced clock in tests — so scenario tests covering
//! a 5-second ARP timeout run instantly instead of actually sleeping.

use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy)]
enum Mode {
    Live,
    Frozen(SystemTime),
}

/// Source of "now" for the ARP cache and timer loop. Not a singleton:
/// the router instance owns one and passes `Arc<parking_lot::Mutex<Clock>>`
/// to whatever needs to read or advance it.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    mode: Mode,
}

impl Clock {
    /// A clock backed by the real system time.
    pub fn live() -> Self {
        Self { mode: Mode::Live }
    }

    /// A clock frozen at the current system time, advanced only by
    /// explicit calls to `advance`. Used by tests.
    pub fn frozen() -> Self {
        Self {
            mode: Mode::Frozen(SystemTime::now()),
        }
    }

    pub fn now(&self) -> SystemTime {
        match self.mode {
            Mode::Live => SystemTime::now(),
            Mode::Frozen(t) => t,
        }
    }

    /// Advances a frozen clock by `duration`.
    ///
    /// # Panics
    /// Panics if the clock is live — advancing real time makes no sense.
    pub fn advance(&mut self, duration: Duration) {
        match &mut self.mode {
            Mode::Frozen(t) => *t += duration,
            Mode::Live => panic!("cannot advance a live clock"),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::live()
    }
}
