//! Interpolation engine contract.
//!
//! The engine owns the actual motion of every stream. The animation core only talks to it
//! through [`Interpolator`]; lifecycle callbacks come back as [`EngineEvent`]s which the stage
//! drains and routes strictly in order, one at a time.

pub(crate) mod tween;

use crate::animation::preset::MotionTarget;
use crate::animation::props::{PropPatch, VisualProps};
use crate::foundation::core::{ElementId, Millis};

/// One interpolation stream: stream `index` of element `element`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamKey {
    pub element: ElementId,
    pub index: usize,
}

impl StreamKey {
    pub fn new(element: ElementId, index: usize) -> Self {
        Self { element, index }
    }
}

/// Identifies one `start` call. Events of an interrupted run carry its old id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);

/// Arguments of [`Interpolator::start`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamStart {
    pub target: MotionTarget,
    pub delay_ms: Millis,
    /// Discard any in-flight run and begin from `target.from`.
    pub reset: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEventKind {
    /// The run left its delay and began moving.
    Start,
    /// New values were produced.
    Change(VisualProps),
    /// The run reached its target.
    Rest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineEvent {
    pub key: StreamKey,
    pub run: RunId,
    pub kind: EngineEventKind,
}

/// Contract every interpolation engine satisfies.
///
/// `Rest` fires exactly once per `start`, unless the run is superseded by another `start` with
/// `reset: true` or cancelled by `stop`, in which case it never fires for that run.
pub trait Interpolator {
    /// Begin a run on `key`, creating the stream if needed.
    fn start(&mut self, key: &StreamKey, cfg: StreamStart) -> RunId;
    /// Cancel the in-flight run (if any) and keep current values.
    fn stop(&mut self, key: &StreamKey);
    /// Freeze the in-flight run. Idempotent.
    fn pause(&mut self, key: &StreamKey);
    /// Unfreeze the in-flight run. Idempotent.
    fn resume(&mut self, key: &StreamKey);
    /// Overwrite values instantly, without interpolation and without events.
    fn set(&mut self, key: &StreamKey, patch: &PropPatch);
    /// Current values of a stream.
    fn values(&self, key: &StreamKey) -> Option<VisualProps>;
    /// Drop all state for a stream.
    fn release(&mut self, key: &StreamKey);
    /// Step the engine's own clock.
    fn advance(&mut self, dt_ms: Millis);
    /// Take the callbacks produced since the last drain, in emission order.
    fn drain_events(&mut self) -> Vec<EngineEvent>;
}

pub use tween::TweenEngine;
