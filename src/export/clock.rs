use crate::foundation::core::Millis;

/// What one clock step produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockTick {
    /// The counter moved to `frame` (1-based, `1..=total`).
    Frame(u64),
    /// The clock came to rest. Fires exactly once.
    Rest,
    /// The clock already rested; nothing happens.
    Idle,
}

/// Virtual frame clock: an integer counter stepped by the export driver, never by wall time.
#[derive(Clone, Debug)]
pub struct FrameClock {
    total: u64,
    current: u64,
    step_ms: Millis,
    halted: bool,
    rested: bool,
}

impl FrameClock {
    pub fn new(total: u64, step_ms: Millis) -> Self {
        Self {
            total,
            current: 0,
            step_ms,
            halted: false,
            rested: false,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn step_ms(&self) -> Millis {
        self.step_ms
    }

    /// Virtual time of the current frame.
    pub fn time_ms(&self) -> Millis {
        self.current as f64 * self.step_ms
    }

    pub fn is_rested(&self) -> bool {
        self.rested
    }

    /// Stop counting. The next step rests wherever the counter is.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn tick(&mut self) -> ClockTick {
        if self.rested {
            return ClockTick::Idle;
        }
        if self.halted || self.current >= self.total {
            self.rested = true;
            return ClockTick::Rest;
        }
        self.current += 1;
        ClockTick::Frame(self.current)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/clock.rs"]
mod tests;
