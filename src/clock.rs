//! Time sources for the timer.
//!
//! All readings are epoch milliseconds so that the same value can be used
//! both for elapsed-time arithmetic and as a history timestamp.

use std::{
    cell::Cell,
    rc::Rc,
    time::Instant,
};

pub trait Clock {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Wall-clock anchored monotonic clock.
///
/// The wall clock is sampled once; later readings add the monotonic time
/// elapsed since then, so a system clock adjustment can never make the
/// timer run backwards.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor: Instant,
    anchor_epoch_ms: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
            anchor_epoch_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.anchor_epoch_ms + self.anchor.elapsed().as_millis() as i64
    }
}

/// Manually advanced clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self { now: Rc::new(Cell::new(start_ms)) }
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}
