use std::collections::BTreeMap;

use crate::animation::preset::MotionTarget;
use crate::animation::props::{PropPatch, VisualProps};
use crate::engine::{EngineEvent, EngineEventKind, Interpolator, RunId, StreamKey, StreamStart};
use crate::foundation::core::Millis;

#[derive(Clone, Debug)]
struct ActiveRun {
    id: RunId,
    target: MotionTarget,
    delay_left: Millis,
    elapsed: Millis,
    started: bool,
}

#[derive(Clone, Debug, Default)]
struct StreamState {
    values: VisualProps,
    run: Option<ActiveRun>,
    paused: bool,
}

/// Deterministic, time-stepped tween engine.
///
/// Time only moves through [`Interpolator::advance`], which makes it usable both for real-time
/// playback (advance by wall-clock deltas) and for export (advance by the virtual frame step).
/// Streams are stepped in key order so event order is reproducible.
#[derive(Debug, Default)]
pub struct TweenEngine {
    streams: BTreeMap<StreamKey, StreamState>,
    next_run: u64,
    events: Vec<EngineEvent>,
}

impl TweenEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any stream still has an in-flight run.
    pub fn is_busy(&self) -> bool {
        self.streams.values().any(|s| s.run.is_some())
    }

    /// Whether `key` is currently paused.
    pub fn is_paused(&self, key: &StreamKey) -> bool {
        self.streams.get(key).is_some_and(|s| s.paused)
    }

    fn step_stream(
        key: &StreamKey,
        state: &mut StreamState,
        dt_ms: Millis,
        out: &mut Vec<EngineEvent>,
    ) {
        if state.paused {
            return;
        }
        let Some(run) = state.run.as_mut() else {
            return;
        };

        let mut remaining = dt_ms;
        if run.delay_left > 0.0 {
            let used = run.delay_left.min(remaining);
            run.delay_left -= used;
            remaining -= used;
            if run.delay_left > 0.0 {
                return;
            }
        }

        let id = run.id;
        if !run.started {
            run.started = true;
            state.values = run.target.from;
            out.push(EngineEvent {
                key: key.clone(),
                run: id,
                kind: EngineEventKind::Start,
            });
        }

        run.elapsed += remaining;
        let t = if run.target.duration_ms <= 0.0 {
            1.0
        } else {
            (run.elapsed / run.target.duration_ms).min(1.0)
        };
        let done = t >= 1.0;
        state.values = if done {
            run.target.to
        } else {
            VisualProps::lerp(&run.target.from, &run.target.to, run.target.ease.apply(t))
        };
        out.push(EngineEvent {
            key: key.clone(),
            run: id,
            kind: EngineEventKind::Change(state.values),
        });

        if done {
            state.run = None;
            out.push(EngineEvent {
                key: key.clone(),
                run: id,
                kind: EngineEventKind::Rest,
            });
        }
    }
}

impl Interpolator for TweenEngine {
    fn start(&mut self, key: &StreamKey, cfg: StreamStart) -> RunId {
        self.next_run += 1;
        let id = RunId(self.next_run);
        let state = self.streams.entry(key.clone()).or_default();

        let mut target = cfg.target;
        if cfg.reset {
            // held through the delay
            state.values = target.from;
        } else {
            // Retarget from wherever the stream currently is.
            target.from = state.values;
        }
        state.run = Some(ActiveRun {
            id,
            target,
            delay_left: cfg.delay_ms.max(0.0),
            elapsed: 0.0,
            started: false,
        });
        state.paused = false;
        tracing::trace!(element = %key.element, index = key.index, run = id.0, "stream start");
        id
    }

    fn stop(&mut self, key: &StreamKey) {
        if let Some(state) = self.streams.get_mut(key) {
            state.run = None;
            state.paused = false;
        }
    }

    fn pause(&mut self, key: &StreamKey) {
        if let Some(state) = self.streams.get_mut(key) {
            state.paused = true;
        }
    }

    fn resume(&mut self, key: &StreamKey) {
        if let Some(state) = self.streams.get_mut(key) {
            state.paused = false;
        }
    }

    fn set(&mut self, key: &StreamKey, patch: &PropPatch) {
        let state = self.streams.entry(key.clone()).or_default();
        patch.apply(&mut state.values);
    }

    fn values(&self, key: &StreamKey) -> Option<VisualProps> {
        self.streams.get(key).map(|s| s.values)
    }

    fn release(&mut self, key: &StreamKey) {
        self.streams.remove(key);
    }

    fn advance(&mut self, dt_ms: Millis) {
        let dt_ms = dt_ms.max(0.0);
        let mut out = std::mem::take(&mut self.events);
        for (key, state) in self.streams.iter_mut() {
            Self::step_stream(key, state, dt_ms, &mut out);
        }
        self.events = out;
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/tween.rs"]
mod tests;
