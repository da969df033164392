use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::pipeline::{CapturePipeline, FinalAsset};
use crate::capture::raster::RasterSurface;
use crate::capture::recorder::Recorder;
use crate::capture::surface::CaptureSurface;
use crate::config::settings::{CanvasMode, ExportSettings};
use crate::config::template::TemplateDoc;
use crate::export::driver::{DriverConfig, DriverState, ExportFrameDriver, ExportReport, StepOutcome};
use crate::export::resolution::Resolution;
use crate::export::watchdog::{RENDER_TIMEOUT_MS, RenderWatchdog};
use crate::foundation::clock::HostClock;
use crate::foundation::core::{Canvas, Millis};
use crate::foundation::error::{MotionError, MotionResult};
use crate::handshake::transport::TransportAsset;
use crate::handshake::{CompletionHandshake, HandshakeSink};
use crate::stage::Stage;

const READY_POLL_MS: u64 = 10;

/// Conditions that must all hold before recording starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessGate {
    pub template_loaded: bool,
    pub scale_positive: bool,
    pub has_pages: bool,
    pub poster_captured: bool,
    pub render_finished: bool,
}

impl ReadinessGate {
    pub fn is_open(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.template_loaded, "template"),
            (self.scale_positive, "resolution"),
            (self.has_pages, "pages"),
            (self.poster_captured, "poster"),
            (self.render_finished, "render"),
        ]
        .into_iter()
        .filter_map(|(ok, name)| (!ok).then_some(name))
        .collect()
    }
}

/// Cross-thread switches for a running export.
///
/// `cancel` discards the run and clears progress. `interrupt` halts the virtual clock, so the
/// run ends early and is reported as truncated.
#[derive(Clone, Debug, Default)]
pub struct ExportControl {
    cancel: Arc<AtomicBool>,
    interrupt: Arc<AtomicBool>,
}

impl ExportControl {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn take_interrupt(&self) -> bool {
        self.interrupt.swap(false, Ordering::SeqCst)
    }
}

/// Everything a delivered export produced.
#[derive(Clone, Debug)]
pub struct ExportOutput {
    pub resolution: Resolution,
    pub report: ExportReport,
    pub asset: FinalAsset,
    pub transport: TransportAsset,
}

#[derive(Clone, Debug)]
pub enum ExportOutcome {
    Delivered(Box<ExportOutput>),
    Cancelled { report: ExportReport },
}

/// One headless export of a template: load, gate, record, finalize, hand over.
#[derive(Debug)]
pub struct ExportSession {
    template: TemplateDoc,
    settings: ExportSettings,
    base_dir: PathBuf,
    control: ExportControl,
    watchdog_window_ms: Millis,
    ready_limit_ms: Millis,
}

impl ExportSession {
    pub fn new(template: TemplateDoc, settings: ExportSettings) -> Self {
        Self {
            template,
            settings,
            base_dir: PathBuf::from("."),
            control: ExportControl::default(),
            watchdog_window_ms: RENDER_TIMEOUT_MS,
            ready_limit_ms: RENDER_TIMEOUT_MS * 2.0,
        }
    }

    /// Directory that relative media paths in the template resolve against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Override the render watchdog window and how long to wait for readiness overall.
    pub fn with_timeouts(mut self, watchdog_window_ms: Millis, ready_limit_ms: Millis) -> Self {
        self.watchdog_window_ms = watchdog_window_ms;
        self.ready_limit_ms = ready_limit_ms;
        self
    }

    pub fn template(&self) -> &TemplateDoc {
        &self.template
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn control(&self) -> ExportControl {
        self.control.clone()
    }

    pub fn resolution(&self) -> MotionResult<Resolution> {
        Resolution::fit(
            self.template.width,
            self.template.height,
            self.settings.ideal_resolution,
        )
    }

    pub fn duration_ms(&self) -> Millis {
        self.settings
            .duration_ms
            .unwrap_or_else(|| self.template.effective_duration_ms())
    }

    /// Name used in the virtual asset path.
    pub fn size_id(&self) -> &str {
        [&self.template.size_id, &self.template.template_id]
            .into_iter()
            .find_map(|v| v.as_deref().filter(|s| !s.trim().is_empty()))
            .unwrap_or("export")
    }

    /// The CPU surface for this template at its export resolution, mounted.
    pub fn build_surface(&self) -> MotionResult<RasterSurface> {
        let res = self.resolution()?;
        let mut surface = RasterSurface::new(
            Canvas {
                width: res.width,
                height: res.height,
            },
            res.scale,
        )
        .with_audio(self.template.load_audio_tracks(&self.base_dir));
        if let Some(bg) = self.template.background {
            surface = surface.with_background(bg);
        }
        surface.mount();
        Ok(surface)
    }

    /// Run the export on the built-in raster surface.
    pub fn run<S: HandshakeSink>(
        &self,
        recorder: Box<dyn Recorder>,
        handshake: &mut CompletionHandshake<S>,
        clock: &dyn HostClock,
    ) -> MotionResult<ExportOutcome> {
        let mut surface = match self.build_surface() {
            Ok(s) => s,
            Err(e) => {
                report(handshake, &e);
                return Err(e);
            }
        };
        self.run_on(&mut surface, recorder, handshake, clock)
    }

    /// Run the export on `surface`. Every failure is also reported through `handshake`.
    #[tracing::instrument(skip_all, fields(size_id = self.size_id()))]
    pub fn run_on<S: HandshakeSink>(
        &self,
        surface: &mut dyn CaptureSurface,
        recorder: Box<dyn Recorder>,
        handshake: &mut CompletionHandshake<S>,
        clock: &dyn HostClock,
    ) -> MotionResult<ExportOutcome> {
        let result = self.export(surface, recorder, handshake, clock);
        if let Err(e) = &result {
            report(handshake, e);
        }
        result
    }

    fn export<S: HandshakeSink>(
        &self,
        surface: &mut dyn CaptureSurface,
        recorder: Box<dyn Recorder>,
        handshake: &mut CompletionHandshake<S>,
        clock: &dyn HostClock,
    ) -> MotionResult<ExportOutcome> {
        self.template.require_identifiers()?;
        self.template.validate()?;
        self.settings.validate()?;
        let resolution = self.resolution()?;
        let mut watchdog = RenderWatchdog::with_window(clock.now_ms(), self.watchdog_window_ms);

        let mut stage = Stage::new();
        for page in &self.template.pages {
            stage.mount_page(self.template.page_mounts(page, CanvasMode::Exporter));
        }
        stage.activate_page(self.template.pages.first().map(|p| p.id.clone()));

        let poster = surface.poster(&stage.snapshot())?;
        let gate = ReadinessGate {
            template_loaded: true,
            scale_positive: resolution.scale > 0.0,
            has_pages: !self.template.pages.is_empty(),
            poster_captured: !poster.is_empty(),
            render_finished: false,
        };
        self.wait_ready(gate, &stage, surface, &mut watchdog, handshake, clock)?;

        let cfg = DriverConfig {
            duration_ms: self.duration_ms(),
            fps: self.settings.fps()?,
            format: self.settings.format,
        };
        let mut driver = ExportFrameDriver::new(cfg, CapturePipeline::new(recorder));
        driver.set_poster(poster);
        driver.begin(&mut stage, surface)?;

        loop {
            if self.control.is_cancelled() {
                driver.cancel()?;
                handshake.reset();
                return Ok(ExportOutcome::Cancelled {
                    report: driver.report(),
                });
            }
            if self.control.take_interrupt() {
                driver.interrupt();
            }
            let outcome = driver.step(&mut stage, surface)?;
            if let Some(e) = watchdog.check(
                clock.now_ms(),
                surface.is_render_finished(),
                driver.state() == DriverState::Completed,
            ) {
                handshake.report_error(&e)?;
            }
            match outcome {
                StepOutcome::Frame { progress, .. } => handshake.report_progress(progress)?,
                StepOutcome::Completed => break,
            }
        }
        if !driver.page_settled() {
            tracing::debug!("recording ended before every animation rested");
        }

        let asset = driver.finalize()?;
        let transport = TransportAsset::encode(&asset, self.size_id(), self.settings.format);
        handshake.deliver(&transport, clock.now_ms())?;
        handshake.wait_completed(clock)?;

        let report = driver.report();
        tracing::info!(frames = report.captured_frames, digest = report.digest, "export delivered");
        Ok(ExportOutcome::Delivered(Box::new(ExportOutput {
            resolution,
            report,
            asset,
            transport,
        })))
    }

    /// Paint until the surface reports a finished render. The watchdog only reports; giving
    /// up happens at the separate readiness limit.
    fn wait_ready<S: HandshakeSink>(
        &self,
        mut gate: ReadinessGate,
        stage: &Stage,
        surface: &mut dyn CaptureSurface,
        watchdog: &mut RenderWatchdog,
        handshake: &mut CompletionHandshake<S>,
        clock: &dyn HostClock,
    ) -> MotionResult<()> {
        let started = clock.now_ms();
        loop {
            gate.render_finished = surface.is_render_finished();
            if gate.is_open() {
                return Ok(());
            }
            let now = clock.now_ms();
            if let Some(e) = watchdog.check(now, gate.render_finished, false) {
                handshake.report_error(&e)?;
            }
            if now - started >= self.ready_limit_ms {
                return Err(MotionError::capture_not_ready(format!(
                    "export not ready, missing: {}",
                    gate.missing().join(", ")
                )));
            }
            surface.render(&stage.snapshot())?;
            if !surface.is_render_finished() {
                std::thread::sleep(std::time::Duration::from_millis(READY_POLL_MS));
            }
        }
    }
}

fn report<S: HandshakeSink>(handshake: &mut CompletionHandshake<S>, err: &MotionError) {
    if let Err(e) = handshake.report_error(err) {
        tracing::warn!("could not report export error: {e}");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/session.rs"]
mod tests;
