//! motionreel animates template pages element by element and exports them as video.
//!
//! The crate has two halves that share one animation core:
//!
//! - A [`Stage`] that mounts template pages, publishes page-level sequencing requests (play,
//!   stop, reset, preview) and routes interpolation callbacks back to each element.
//! - A deterministic export path: an [`ExportFrameDriver`] steps a virtual frame clock, captures
//!   every frame through a [`CapturePipeline`] and hands the finished asset to the host through
//!   a [`CompletionHandshake`]. [`ExportSession`] wires the two together for a whole template.
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod capture;
pub(crate) mod config;
pub(crate) mod element;
pub(crate) mod engine;
pub(crate) mod export;
pub(crate) mod handshake;
pub(crate) mod sequencer;
pub(crate) mod stage;

pub use crate::foundation::clock::{HostClock, ManualClock, SystemClock};
pub use crate::foundation::core::{Canvas, ElementId, Fps, FrameIndex, Millis, PageId};
pub use crate::foundation::error::{MotionError, MotionResult};

pub use crate::animation::ease::Ease;
pub use crate::animation::preset::{MotionTarget, motion_target};
pub use crate::animation::props::{
    AnimateSet, AnimationId, AnimationOverrides, Direction, ElementAnimationConfig, PropPatch,
    VisualProps,
};
pub use crate::element::completion::{PageCompletion, PlayCompletion, PlayOutcome};
pub use crate::element::controller::{
    AnimationStatus, AnimatorSpec, ElementAnimator, ElementStatusView, StreamLayout,
};
pub use crate::element::tokens::{TypeWriting, token_count, tokens};
pub use crate::engine::{
    EngineEvent, EngineEventKind, Interpolator, RunId, StreamKey, StreamStart, TweenEngine,
};
pub use crate::sequencer::reaction::{ElementView, PAGE_PREVIEW_STAGGER_MS, Reaction, decide};
pub use crate::sequencer::{
    ChangeSet, PageSequencer, PlayDirection, PreviewMode, PreviewRequest, SequencingState,
    SequencingUpdate,
};
pub use crate::stage::{
    ElementMount, ElementVisual, PREVIEW_DEBOUNCE_MS, Rgba8, SceneSnapshot, Stage,
};

pub use crate::capture::audio::{
    AudioTrack, DECODE_SAMPLE_RATE, MixedAudio, decode_media_audio, mix_tracks,
};
pub use crate::capture::ffmpeg::{FfmpegRecorder, FfmpegRecorderOpts, is_ffmpeg_on_path};
pub use crate::capture::pipeline::{CapturePipeline, FinalAsset, PipelineState};
pub use crate::capture::raster::RasterSurface;
pub use crate::capture::recorder::{
    ContainerTag, MemoryRecorder, Recorder, RecordingConfig, RecordingState,
};
pub use crate::capture::surface::{CaptureSurface, FrameRGBA, VideoStream};

pub use crate::config::settings::{CanvasMode, ExportFormat, ExportSettings};
pub use crate::config::template::{ElementDef, ElementFrame, ElementKind, PageDef, TemplateDoc};

pub use crate::export::clock::{ClockTick, FrameClock};
pub use crate::export::digest::CaptureDigest;
pub use crate::export::driver::{
    DriverConfig, DriverState, ExportFrameDriver, ExportReport, StepOutcome,
};
pub use crate::export::resolution::Resolution;
pub use crate::export::session::{
    ExportControl, ExportOutcome, ExportOutput, ExportSession, ReadinessGate,
};
pub use crate::export::watchdog::{RENDER_TIMEOUT_MS, RenderWatchdog};

pub use crate::handshake::transport::{TransportAsset, decode_transport, virtual_path};
pub use crate::handshake::{
    CompletionHandshake, ErrorReason, HandshakeEvent, HandshakeSink, JsonLinesHandshake,
    MemoryHandshake,
};
