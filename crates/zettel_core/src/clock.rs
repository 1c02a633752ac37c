//! Time sources for the store.
//!
//! The store never calls `Utc::now()` directly so tests can pin and step time.

use crate::model::timestamp::Timestamp;
use chrono::{TimeDelta, Utc};
use std::cell::Cell;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Deterministic clock that returns `start`, then advances by `step` per call.
#[derive(Debug, Clone)]
pub struct FixedClock {
    next: Cell<Timestamp>,
    step: TimeDelta,
}

impl FixedClock {
    pub fn new(start: Timestamp) -> Self {
        Self::stepping(start, TimeDelta::zero())
    }

    pub fn stepping(start: Timestamp, step: TimeDelta) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        let current = self.next.get();
        self.next.set(current + self.step);
        current
    }
}
