use futures::FutureExt as _;

use crate::animation::props::Direction;
use crate::capture::pipeline::{CapturePipeline, FinalAsset};
use crate::capture::surface::CaptureSurface;
use crate::config::settings::ExportFormat;
use crate::element::completion::PageCompletion;
use crate::engine::Interpolator;
use crate::export::clock::{ClockTick, FrameClock};
use crate::export::digest::CaptureDigest;
use crate::foundation::core::{Fps, FrameIndex, Millis};
use crate::foundation::error::{MotionError, MotionResult};
use crate::foundation::math::round_half_up;
use crate::stage::Stage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Idle,
    Running,
    /// Every frame was captured; waiting for finalize.
    Completed,
    Finalized,
    Cancelled,
    Failed,
}

/// Timing and target of one export run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriverConfig {
    pub duration_ms: Millis,
    pub fps: Fps,
    pub format: ExportFormat,
}

impl DriverConfig {
    pub fn total_frames(&self) -> u64 {
        self.fps.frames_for_duration(self.duration_ms)
    }
}

/// Result of one [`ExportFrameDriver::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Frame { index: FrameIndex, progress: u8 },
    Completed,
}

/// Summary of a run, comparable across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ExportReport {
    pub total_frames: u64,
    pub captured_frames: u64,
    /// xxh3 over the ordered capture sequence.
    pub digest: u64,
}

/// Drives an export with a virtual frame clock.
///
/// Each step captures the current scene with the recorder resumed, pauses it again, records
/// progress and only then advances the stage by one frame of virtual time. Nothing else moves the stage
/// while the driver is running.
#[derive(Debug)]
pub struct ExportFrameDriver {
    cfg: DriverConfig,
    pipeline: CapturePipeline,
    state: DriverState,
    clock: Option<FrameClock>,
    progress: u8,
    final_frame: bool,
    digest: CaptureDigest,
    page: Option<PageCompletion>,
    page_settled: bool,
}

impl ExportFrameDriver {
    pub fn new(cfg: DriverConfig, pipeline: CapturePipeline) -> Self {
        Self {
            cfg,
            pipeline,
            state: DriverState::Idle,
            clock: None,
            progress: 0,
            final_frame: false,
            digest: CaptureDigest::new(),
            page: None,
            page_settled: false,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn current_frame(&self) -> u64 {
        self.clock.as_ref().map_or(0, FrameClock::current)
    }

    pub fn total_frames(&self) -> u64 {
        self.clock
            .as_ref()
            .map_or_else(|| self.cfg.total_frames(), FrameClock::total)
    }

    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    pub fn set_poster(&mut self, jpeg: Vec<u8>) {
        self.pipeline.set_poster(jpeg);
    }

    /// Whether every element animation started by this run has settled.
    pub fn page_settled(&mut self) -> bool {
        if !self.page_settled
            && let Some(page) = self.page.as_mut()
            && page.now_or_never().is_some()
        {
            // a resolved join must not be polled again
            self.page = None;
            self.page_settled = true;
        }
        self.page_settled
    }

    pub fn report(&self) -> ExportReport {
        ExportReport {
            total_frames: self.total_frames(),
            captured_frames: self.digest.frames(),
            digest: self.digest.digest(),
        }
    }

    /// Open the recording and enter `Running`, starting page playback.
    ///
    /// When the surface cannot produce a stream the driver stays `Idle`.
    #[tracing::instrument(skip_all, fields(duration_ms = self.cfg.duration_ms, fps = self.cfg.fps.num))]
    pub fn begin<E: Interpolator>(
        &mut self,
        stage: &mut Stage<E>,
        surface: &mut dyn CaptureSurface,
    ) -> MotionResult<()> {
        if self.state != DriverState::Idle {
            return Err(MotionError::invalid_state(format!(
                "export cannot begin from {:?}",
                self.state
            )));
        }
        let total = self.cfg.total_frames();
        if total == 0 {
            return Err(MotionError::validation("export duration yields zero frames"));
        }
        self.pipeline
            .start(surface, self.cfg.fps, self.cfg.format, self.cfg.duration_ms)?;

        self.clock = Some(FrameClock::new(total, self.cfg.fps.frame_duration_ms()));
        self.state = DriverState::Running;
        self.progress = 0;
        self.final_frame = false;
        self.digest = CaptureDigest::new();
        self.page = Some(stage.play_page(Direction::In));
        self.page_settled = false;
        tracing::info!(total_frames = total, "export running");
        Ok(())
    }

    /// Advance the virtual clock by one step.
    pub fn step<E: Interpolator>(
        &mut self,
        stage: &mut Stage<E>,
        surface: &mut dyn CaptureSurface,
    ) -> MotionResult<StepOutcome> {
        if self.state != DriverState::Running {
            return Err(MotionError::invalid_state(format!(
                "export cannot step from {:?}",
                self.state
            )));
        }
        let result = self.step_running(stage, surface);
        if result.is_err() {
            self.fail();
        }
        result
    }

    fn step_running<E: Interpolator>(
        &mut self,
        stage: &mut Stage<E>,
        surface: &mut dyn CaptureSurface,
    ) -> MotionResult<StepOutcome> {
        let clock = self
            .clock
            .as_mut()
            .ok_or_else(|| MotionError::invalid_state("export clock missing"))?;
        let total = clock.total();
        let step_ms = clock.step_ms();

        match clock.tick() {
            ClockTick::Frame(n) => {
                let index = FrameIndex(n - 1);
                let frame = surface.render(&stage.snapshot())?;
                self.digest.record(index, &frame.data);
                self.pipeline.resume();
                self.pipeline.capture(index, &frame)?;
                // the recorder sits paused while virtual time moves
                self.pipeline.pause();

                let progress = round_half_up(n as f64 / total as f64 * 100.0).min(100.0) as u8;
                self.progress = self.progress.max(progress);
                if self.progress == 100 {
                    self.final_frame = true;
                }
                stage.advance(step_ms);
                Ok(StepOutcome::Frame {
                    index,
                    progress: self.progress,
                })
            }
            ClockTick::Rest => {
                let current = clock.current();
                self.pipeline.stop()?;
                if !self.final_frame {
                    return Err(MotionError::truncated(format!(
                        "virtual clock rested at frame {current} of {total}"
                    )));
                }
                self.state = DriverState::Completed;
                tracing::info!(frames = current, "export completed");
                Ok(StepOutcome::Completed)
            }
            ClockTick::Idle => Err(MotionError::invalid_state("export clock already rested")),
        }
    }

    /// Step until the clock rests.
    pub fn run<E: Interpolator>(
        &mut self,
        stage: &mut Stage<E>,
        surface: &mut dyn CaptureSurface,
    ) -> MotionResult<()> {
        loop {
            if let StepOutcome::Completed = self.step(stage, surface)? {
                return Ok(());
            }
        }
    }

    /// Halt the virtual clock where it is. The run then ends without its final frame.
    pub fn interrupt(&mut self) {
        if let Some(clock) = self.clock.as_mut() {
            clock.halt();
        }
    }

    /// Stop the clock and the capture, discard everything and clear progress.
    pub fn cancel(&mut self) -> MotionResult<()> {
        match self.state {
            DriverState::Running | DriverState::Completed => {}
            other => {
                return Err(MotionError::invalid_state(format!(
                    "export cannot be cancelled from {other:?}"
                )));
            }
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.halt();
        }
        self.pipeline.abort();
        self.progress = 0;
        self.final_frame = false;
        self.state = DriverState::Cancelled;
        tracing::info!("export cancelled");
        Ok(())
    }

    /// Hand the finished capture over. Valid once, from `Completed`.
    pub fn finalize(&mut self) -> MotionResult<FinalAsset> {
        if self.state != DriverState::Completed {
            return Err(MotionError::invalid_state(format!(
                "export cannot finalize from {:?}",
                self.state
            )));
        }
        let asset = self.pipeline.finalize()?;
        self.state = DriverState::Finalized;
        Ok(asset)
    }

    fn fail(&mut self) {
        if let Some(clock) = self.clock.as_mut() {
            clock.halt();
        }
        self.pipeline.abort();
        self.state = DriverState::Failed;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/driver.rs"]
mod tests;
