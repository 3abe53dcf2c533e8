//! Source of "now" for auto-timestamped fields.
//!
//! The codec never reads the clock itself. A write captures one instant into a
//! [`WriteContext`] and every field touched by that write sees the same value.

use std::sync::Mutex;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to the microsecond storage resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// Clock that only moves when told to. Used by tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock() = instant;
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut current = self.lock();
        *current += delta;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid instant.
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Per-write state shared by every field encoded in one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteContext {
    pub now: DateTime<Utc>,
    pub is_insert: bool,
}

impl WriteContext {
    pub fn insert(now: DateTime<Utc>) -> Self {
        Self { now, is_insert: true }
    }

    pub fn update(now: DateTime<Utc>) -> Self {
        Self { now, is_insert: false }
    }

    pub fn capture(clock: &dyn Clock, is_insert: bool) -> Self {
        Self {
            now: clock.now(),
            is_insert,
        }
    }
}
