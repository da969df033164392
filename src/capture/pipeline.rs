use crate::capture::audio::mix_tracks;
use crate::capture::recorder::{ContainerTag, Recorder, RecordingConfig};
use crate::capture::surface::{CaptureSurface, FrameRGBA};
use crate::config::settings::ExportFormat;
use crate::foundation::core::{Fps, FrameIndex, Millis};
use crate::foundation::error::{MotionError, MotionResult};

/// Lifecycle of one recording session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Recording,
    Stopped,
    Finalized,
    Aborted,
}

/// The finished recording paired with its poster image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalAsset {
    pub video: Vec<u8>,
    pub container: ContainerTag,
    /// JPEG bytes.
    pub poster: Vec<u8>,
}

/// Owns the recorder and the ordered chunk buffer of one export run.
pub struct CapturePipeline {
    recorder: Box<dyn Recorder>,
    state: PipelineState,
    chunks: Vec<Vec<u8>>,
    poster: Option<Vec<u8>>,
    container: Option<ContainerTag>,
    frames: u64,
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("state", &self.state)
            .field("chunks", &self.chunks.len())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl CapturePipeline {
    pub fn new(recorder: Box<dyn Recorder>) -> Self {
        Self {
            recorder,
            state: PipelineState::Idle,
            chunks: Vec::new(),
            poster: None,
            container: None,
            frames: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames
    }

    pub fn has_poster(&self) -> bool {
        self.poster.is_some()
    }

    /// Keep the poster image captured before recording.
    pub fn set_poster(&mut self, jpeg: Vec<u8>) {
        self.poster = Some(jpeg);
    }

    /// Open the recording session on `surface`.
    ///
    /// Audio of embedded media is mixed into one track of `duration_ms` when the format
    /// carries audio; a template without audio records silently.
    #[tracing::instrument(skip(self, surface))]
    pub fn start(
        &mut self,
        surface: &mut dyn CaptureSurface,
        fps: Fps,
        format: ExportFormat,
        duration_ms: Millis,
    ) -> MotionResult<()> {
        if self.state != PipelineState::Idle {
            return Err(MotionError::invalid_state(format!(
                "capture pipeline cannot start from {:?}",
                self.state
            )));
        }
        let stream = surface.open_stream(fps)?;

        let audio = if format.has_audio() {
            let mixed = mix_tracks(&surface.audio_tracks(), duration_ms);
            if mixed.is_none() {
                tracing::debug!("no audio tracks, recording without audio");
            }
            mixed
        } else {
            None
        };

        let container = ContainerTag::for_format(format);
        self.recorder.start(RecordingConfig {
            width: stream.width,
            height: stream.height,
            fps: stream.fps,
            container: container.clone(),
            audio,
        })?;
        self.container = Some(container);
        self.chunks.clear();
        self.frames = 0;
        self.state = PipelineState::Recording;
        Ok(())
    }

    /// Record one frame and buffer whatever the recorder produced.
    pub fn capture(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MotionResult<()> {
        if self.state != PipelineState::Recording {
            return Err(MotionError::invalid_state("capture pipeline is not recording"));
        }
        for chunk in self.recorder.capture(idx, frame)? {
            self.on_chunk(chunk);
        }
        self.frames += 1;
        Ok(())
    }

    /// Append one encoded segment. Empty segments carry nothing and are skipped.
    pub fn on_chunk(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.chunks.push(chunk);
    }

    pub fn pause(&mut self) {
        self.recorder.pause();
    }

    pub fn resume(&mut self) {
        self.recorder.resume();
    }

    /// Close the session and release the recorder.
    pub fn stop(&mut self) -> MotionResult<()> {
        if self.state != PipelineState::Recording {
            return Err(MotionError::invalid_state("capture pipeline is not recording"));
        }
        let tail = self.recorder.stop();
        self.recorder.release();
        self.state = PipelineState::Stopped;
        for chunk in tail? {
            self.on_chunk(chunk);
        }
        Ok(())
    }

    /// Stop without producing an asset. Buffered chunks are discarded.
    pub fn abort(&mut self) {
        if self.state == PipelineState::Recording {
            let _ = self.recorder.stop();
        }
        self.recorder.release();
        self.chunks.clear();
        if self.state != PipelineState::Finalized {
            self.state = PipelineState::Aborted;
        }
    }

    /// Assemble the buffered chunks into one video and pair it with the poster.
    ///
    /// Valid exactly once, after [`CapturePipeline::stop`].
    #[tracing::instrument(skip(self))]
    pub fn finalize(&mut self) -> MotionResult<FinalAsset> {
        match self.state {
            PipelineState::Stopped => {}
            PipelineState::Finalized => {
                return Err(MotionError::invalid_state("capture already finalized"));
            }
            other => {
                return Err(MotionError::invalid_state(format!(
                    "capture cannot finalize from {other:?}"
                )));
            }
        }
        let poster = self
            .poster
            .clone()
            .ok_or_else(|| MotionError::capture_not_ready("poster image was never captured"))?;
        let container = self
            .container
            .clone()
            .ok_or_else(|| MotionError::invalid_state("capture has no container"))?;

        self.state = PipelineState::Finalized;
        let video = std::mem::take(&mut self.chunks).concat();
        tracing::info!(bytes = video.len(), frames = self.frames, "capture finalized");
        Ok(FinalAsset {
            video,
            container,
            poster,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/pipeline.rs"]
mod tests;
