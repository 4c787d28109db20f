//! Session pacing primitives.
//!
//! Both types are driven by caller-supplied milliseconds so scheduler
//! timing stays deterministic under test.

/// One-shot timer: armed on first `run`, elapses after a duration.
#[derive(Debug, Default)]
pub struct TickTimer {
    started_at: Option<u64>,
}

impl TickTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer at `now` if it is not already running.
    pub fn run(&mut self, now_ms: u64) {
        if self.started_at.is_none() {
            self.started_at = Some(now_ms);
        }
    }

    /// Whether `duration_ms` has elapsed since the timer was armed.
    /// An unarmed timer is never over.
    pub fn is_over(&self, now_ms: u64, duration_ms: u64) -> bool {
        self.started_at
            .is_some_and(|start| now_ms.saturating_sub(start) >= duration_ms)
    }

    pub fn reset(&mut self) {
        self.started_at = None;
    }
}

/// Rate limiter: `ready` returns true at most once per period.
#[derive(Debug, Default)]
pub struct Throttle {
    last: Option<u64>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when at least `period_ms` passed since the last accepted call
    /// (the first call is always accepted).
    pub fn ready(&mut self, now_ms: u64, period_ms: u64) -> bool {
        let accepted = match self.last {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= period_ms,
        };
        if accepted {
            self.last = Some(now_ms);
        }
        accepted
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
