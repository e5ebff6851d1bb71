//! Clock abstraction for reproducible runs.
//!
//! Every component that stamps time takes a [`Clock`] so that a scripted
//! venue plus a fixed clock replay to an identical ledger. Production code
//! uses [`SystemClock`]; tests use [`SimClock`].

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for tests and simulations.
///
/// Optionally advances itself by a fixed step on every reading, which lets
/// deadline-polling loops make progress without wall time passing.
pub struct SimClock {
    inner: Mutex<SimClockState>,
}

struct SimClockState {
    now: DateTime<Utc>,
    auto_advance: Option<Duration>,
}

impl SimClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(SimClockState {
                now: start,
                auto_advance: None,
            }),
        }
    }

    /// Advance the clock by `step` on every `now()` call.
    #[must_use]
    pub fn with_auto_advance(self, step: Duration) -> Self {
        self.inner.lock().auto_advance = Some(step);
        self
    }

    pub fn advance(&self, delta: Duration) {
        self.inner.lock().now += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.inner.lock().now = now;
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.inner.lock();
        let now = state.now;
        if let Some(step) = state.auto_advance {
            state.now += step;
        }
        now
    }
}
