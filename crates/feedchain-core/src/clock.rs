//! Timestamp sources for message creation.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last value handed out by any [`MonotonicClock`] in this process.
static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// A source of strictly increasing timestamps.
pub trait Clock: Send + Sync {
    /// Return a timestamp strictly greater than every previous return value.
    fn next(&self) -> i64;
}

/// Wall-clock milliseconds, bumped by one whenever the wall clock stalls
/// or goes backwards. Strictly increasing process-wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn next(&self) -> i64 {
        let now = now_millis();
        let mut last = LAST_TIMESTAMP.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match LAST_TIMESTAMP.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// A hand-driven clock: each call returns the current value, then advances
/// it by `step`.
#[derive(Debug)]
pub struct ManualClock {
    current: AtomicI64,
    step: i64,
}

impl ManualClock {
    /// Start at `start`, advancing by one millisecond per call.
    pub fn new(start: i64) -> Self {
        Self::with_step(start, 1)
    }

    /// Start at `start`, advancing by `step` per call.
    pub fn with_step(start: i64, step: i64) -> Self {
        Self {
            current: AtomicI64::new(start),
            step,
        }
    }

    /// Jump the clock to a new value.
    pub fn set(&self, value: i64) {
        self.current.store(value, Ordering::SeqCst);
    }

    /// Peek at the value the next call will return.
    pub fn peek(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn next(&self) -> i64 {
        self.current.fetch_add(self.step, Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn next(&self) -> i64 {
        (**self).next()
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
