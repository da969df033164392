use std::fmt;

use crate::capture::audio::MixedAudio;
use crate::capture::surface::FrameRGBA;
use crate::config::settings::ExportFormat;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{MotionError, MotionResult};

/// Media type and codec of a recording, e.g. `video/webm;codecs=vp9`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerTag {
    media_type: String,
    codec: Option<String>,
}

impl ContainerTag {
    pub fn new(media_type: impl Into<String>, codec: Option<&str>) -> Self {
        Self {
            media_type: media_type.into(),
            codec: codec.map(str::to_owned),
        }
    }

    /// Container recorded for `format`. GIF targets are recorded as h264 and converted later.
    pub fn for_format(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Webm => Self::new("video/webm", Some("vp9")),
            ExportFormat::Mp4 => Self::new("video/mp4", Some("avc1")),
            ExportFormat::Gif => Self::new("video/webm", Some("h264")),
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn codec(&self) -> Option<&str> {
        self.codec.as_deref()
    }
}

impl fmt::Display for ContainerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.codec {
            Some(codec) => write!(f, "{};codecs={codec}", self.media_type),
            None => f.write_str(&self.media_type),
        }
    }
}

/// Configuration handed to a [`Recorder`] when a session opens.
#[derive(Clone, Debug)]
pub struct RecordingConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub container: ContainerTag,
    /// The one combined audio track, if the target carries audio.
    pub audio: Option<MixedAudio>,
}

/// State of a recording session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

/// Encoder behind a capture pipeline.
///
/// Every method that produces encoded data returns it as chunks, in order; the pipeline appends
/// them verbatim.
pub trait Recorder {
    fn start(&mut self, cfg: RecordingConfig) -> MotionResult<()>;
    /// Record one frame. Frames arrive in strictly increasing index order.
    fn capture(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MotionResult<Vec<Vec<u8>>>;
    fn pause(&mut self);
    /// Resume the recording cadence. No-op unless paused.
    fn resume(&mut self);
    /// Flush and close the session, returning any trailing chunks.
    fn stop(&mut self) -> MotionResult<Vec<Vec<u8>>>;
    /// Drop every resource held by the recorder. Safe in any state.
    fn release(&mut self);
    fn state(&self) -> RecordingState;
    fn container(&self) -> Option<&ContainerTag>;
}

/// Recorder that keeps each captured frame as one raw chunk.
#[derive(Debug)]
pub struct MemoryRecorder {
    cfg: Option<RecordingConfig>,
    state: RecordingState,
    last_idx: Option<FrameIndex>,
    frames: u64,
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self {
            cfg: None,
            state: RecordingState::Idle,
            last_idx: None,
            frames: 0,
        }
    }

    pub fn frames_recorded(&self) -> u64 {
        self.frames
    }

    pub fn config(&self) -> Option<&RecordingConfig> {
        self.cfg.as_ref()
    }
}

impl Recorder for MemoryRecorder {
    fn start(&mut self, cfg: RecordingConfig) -> MotionResult<()> {
        if self.state == RecordingState::Recording || self.state == RecordingState::Paused {
            return Err(MotionError::invalid_state("recorder already started"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(MotionError::validation("recording width/height must be non-zero"));
        }
        self.cfg = Some(cfg);
        self.state = RecordingState::Recording;
        self.last_idx = None;
        self.frames = 0;
        Ok(())
    }

    fn capture(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MotionResult<Vec<Vec<u8>>> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| MotionError::invalid_state("recorder not started"))?;
        if self.state == RecordingState::Stopped {
            return Err(MotionError::invalid_state("recorder already stopped"));
        }
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(MotionError::invalid_state("recorder received out-of-order frame index"));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(MotionError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        self.last_idx = Some(idx);
        if self.state == RecordingState::Paused {
            return Ok(Vec::new());
        }
        self.frames += 1;
        Ok(vec![frame.data.clone()])
    }

    fn pause(&mut self) {
        if self.state == RecordingState::Recording {
            self.state = RecordingState::Paused;
        }
    }

    fn resume(&mut self) {
        if self.state == RecordingState::Paused {
            self.state = RecordingState::Recording;
        }
    }

    fn stop(&mut self) -> MotionResult<Vec<Vec<u8>>> {
        if self.cfg.is_none() {
            return Err(MotionError::invalid_state("recorder not started"));
        }
        self.state = RecordingState::Stopped;
        Ok(Vec::new())
    }

    fn release(&mut self) {
        self.state = RecordingState::Idle;
        self.last_idx = None;
    }

    fn state(&self) -> RecordingState {
        self.state
    }

    fn container(&self) -> Option<&ContainerTag> {
        self.cfg.as_ref().map(|c| &c.container)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/recorder.rs"]
mod tests;
