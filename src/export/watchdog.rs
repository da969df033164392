use crate::foundation::core::Millis;
use crate::foundation::error::MotionError;

pub const RENDER_TIMEOUT_MS: Millis = 30_000.0;
pub const MSG_RENDER_TIMEOUT: &str = "The process to render template is taking too long!";

/// Reports a timeout when the template has neither rendered nor finished recording in time.
///
/// It only reports; the run itself is left alone.
#[derive(Clone, Debug)]
pub struct RenderWatchdog {
    window_ms: Millis,
    deadline_ms: Millis,
    fired: bool,
}

impl RenderWatchdog {
    pub fn new(now_ms: Millis) -> Self {
        Self::with_window(now_ms, RENDER_TIMEOUT_MS)
    }

    pub fn with_window(now_ms: Millis, window_ms: Millis) -> Self {
        Self {
            window_ms,
            deadline_ms: now_ms + window_ms,
            fired: false,
        }
    }

    pub fn deadline_ms(&self) -> Millis {
        self.deadline_ms
    }

    /// Restart the window, e.g. after the render or record state changed.
    pub fn rearm(&mut self, now_ms: Millis) {
        self.deadline_ms = now_ms + self.window_ms;
        self.fired = false;
    }

    /// Returns the timeout error the first time the deadline passes while still unfinished.
    pub fn check(
        &mut self,
        now_ms: Millis,
        render_finished: bool,
        record_finished: bool,
    ) -> Option<MotionError> {
        if self.fired || render_finished || record_finished || now_ms < self.deadline_ms {
            return None;
        }
        self.fired = true;
        tracing::warn!(deadline_ms = self.deadline_ms, "render watchdog fired");
        Some(MotionError::timeout(MSG_RENDER_TIMEOUT))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/watchdog.rs"]
mod tests;
