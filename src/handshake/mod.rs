//! Boundary to the host process that launched the export.
//!
//! The host polls for signals; here every signal is an explicit [`HandshakeEvent`] written to a
//! [`HandshakeSink`]. Errors carry one of the fixed [`ErrorReason`] tags, and the completion
//! marker is held back until both assets have been ready for a short settle delay.

pub(crate) mod transport;

use std::io::Write;

use crate::foundation::clock::HostClock;
use crate::foundation::core::Millis;
use crate::foundation::error::{MotionError, MotionResult};
use crate::handshake::transport::TransportAsset;

/// Delay between both assets being ready and the completion marker.
pub const SETTLE_DELAY_MS: Millis = 200.0;

pub const MSG_DELIVERY_FAILED: &str = "Export video failed, please try again.";

/// Fixed failure tags understood by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Configuration,
    Timeout,
    CaptureNotReady,
    TruncatedExport,
    DownstreamDelivery,
}

/// One signal sent to the host.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HandshakeEvent {
    Progress { percent: u8 },
    Error { reason: ErrorReason, message: String },
    VideoPath { path: String },
    Video { data: String },
    Poster { data: String },
    Completed,
}

/// Destination of handshake events.
pub trait HandshakeSink {
    fn emit(&mut self, event: HandshakeEvent) -> MotionResult<()>;
}

/// Keeps every event; for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryHandshake {
    events: Vec<HandshakeEvent>,
}

impl MemoryHandshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HandshakeEvent] {
        &self.events
    }

    pub fn errors(&self) -> impl Iterator<Item = (ErrorReason, &str)> {
        self.events.iter().filter_map(|e| match e {
            HandshakeEvent::Error { reason, message } => Some((*reason, message.as_str())),
            _ => None,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.events.contains(&HandshakeEvent::Completed)
    }
}

impl HandshakeSink for MemoryHandshake {
    fn emit(&mut self, event: HandshakeEvent) -> MotionResult<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesHandshake<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesHandshake<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HandshakeSink for JsonLinesHandshake<W> {
    fn emit(&mut self, event: HandshakeEvent) -> MotionResult<()> {
        let write = |out: &mut W| -> std::io::Result<()> {
            serde_json::to_writer(&mut *out, &event)?;
            out.write_all(b"\n")?;
            out.flush()
        };
        write(&mut self.out)
            .map_err(|e| MotionError::delivery(format!("failed to write handshake event: {e}")))
    }
}

impl<S: HandshakeSink + ?Sized> HandshakeSink for &mut S {
    fn emit(&mut self, event: HandshakeEvent) -> MotionResult<()> {
        (**self).emit(event)
    }
}

/// Progress, error and completion reporting of one export run.
#[derive(Debug)]
pub struct CompletionHandshake<S: HandshakeSink> {
    sink: S,
    settle_ms: Millis,
    progress: u8,
    video_ready: bool,
    poster_ready: bool,
    ready_at: Option<Millis>,
    completed: bool,
}

impl<S: HandshakeSink> CompletionHandshake<S> {
    pub fn new(sink: S) -> Self {
        Self::with_settle_delay(sink, SETTLE_DELAY_MS)
    }

    pub fn with_settle_delay(sink: S, settle_ms: Millis) -> Self {
        Self {
            sink,
            settle_ms,
            progress: 0,
            video_ready: false,
            poster_ready: false,
            ready_at: None,
            completed: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Report progress. Values never go backwards within a run.
    pub fn report_progress(&mut self, percent: u8) -> MotionResult<()> {
        let percent = percent.min(100);
        if percent <= self.progress {
            return Ok(());
        }
        self.progress = percent;
        self.sink.emit(HandshakeEvent::Progress { percent })
    }

    pub fn report_error(&mut self, err: &MotionError) -> MotionResult<()> {
        tracing::warn!(reason = ?err.reason(), "export error: {}", err.message());
        self.sink.emit(HandshakeEvent::Error {
            reason: err.reason(),
            message: err.message(),
        })
    }

    /// The artifact handoff downstream failed; the run may be retried from scratch.
    pub fn report_delivery_failure(&mut self) -> MotionResult<()> {
        self.report_error(&MotionError::delivery(MSG_DELIVERY_FAILED))
    }

    pub fn deliver_video(&mut self, path: &str, data: &str, now_ms: Millis) -> MotionResult<()> {
        if self.video_ready {
            return Err(MotionError::invalid_state("video already delivered"));
        }
        self.sink.emit(HandshakeEvent::VideoPath {
            path: path.to_owned(),
        })?;
        self.sink.emit(HandshakeEvent::Video {
            data: data.to_owned(),
        })?;
        self.video_ready = true;
        self.arm(now_ms);
        Ok(())
    }

    pub fn deliver_poster(&mut self, data: &str, now_ms: Millis) -> MotionResult<()> {
        if self.poster_ready {
            return Err(MotionError::invalid_state("poster already delivered"));
        }
        self.sink.emit(HandshakeEvent::Poster {
            data: data.to_owned(),
        })?;
        self.poster_ready = true;
        self.arm(now_ms);
        Ok(())
    }

    pub fn deliver(&mut self, asset: &TransportAsset, now_ms: Millis) -> MotionResult<()> {
        self.deliver_video(&asset.path, &asset.video, now_ms)?;
        self.deliver_poster(&asset.poster, now_ms)
    }

    fn arm(&mut self, now_ms: Millis) {
        if self.video_ready && self.poster_ready && self.ready_at.is_none() {
            self.ready_at = Some(now_ms + self.settle_ms);
        }
    }

    /// Emit the completion marker once the settle delay has elapsed. Returns whether the run is
    /// completed.
    pub fn poll(&mut self, now_ms: Millis) -> MotionResult<bool> {
        if self.completed {
            return Ok(true);
        }
        let Some(ready_at) = self.ready_at else {
            return Ok(false);
        };
        if now_ms < ready_at {
            return Ok(false);
        }
        self.sink.emit(HandshakeEvent::Completed)?;
        self.completed = true;
        Ok(true)
    }

    /// Block until the completion marker is emitted, sleeping between polls.
    pub fn wait_completed(&mut self, clock: &dyn HostClock) -> MotionResult<()> {
        if self.ready_at.is_none() {
            return Err(MotionError::invalid_state("assets are not ready"));
        }
        while !self.poll(clock.now_ms())? {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        Ok(())
    }

    /// Clear run state so a fresh run can report through the same sink.
    pub fn reset(&mut self) {
        self.progress = 0;
        self.video_ready = false;
        self.poster_ready = false;
        self.ready_at = None;
        self.completed = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/handshake/mod.rs"]
mod tests;
