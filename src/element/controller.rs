use futures::channel::oneshot;
use smallvec::SmallVec;

use crate::animation::preset::motion_target;
use crate::animation::props::{Direction, ElementAnimationConfig, PropPatch, VisualProps};
use crate::element::completion::PlayCompletion;
use crate::element::tokens::TypeWriting;
use crate::engine::{EngineEvent, EngineEventKind, Interpolator, RunId, StreamKey, StreamStart};
use crate::foundation::core::{ElementId, Millis, PageId};
use crate::foundation::math::round1;

/// Lifecycle of one element's animation. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationStatus {
    #[default]
    Idle,
    /// Entering, streams started but none has left its delay yet.
    Preparing,
    Animating,
    /// Exit played to the end; the element stays in its exited state until reset.
    Finished,
}

/// Stream topology of an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamLayout {
    /// One stream for the whole element.
    Grouped,
    /// One stream per token of a text element.
    Tokenized(TypeWriting),
}

/// Read-only projection of an element's animation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ElementStatusView {
    pub status: AnimationStatus,
    pub direction: Option<Direction>,
    pub waiting_to_play: bool,
    pub paused: bool,
}

impl ElementStatusView {
    pub fn is_preparing(&self) -> bool {
        self.status == AnimationStatus::Preparing
    }

    pub fn is_animating(&self) -> bool {
        self.status == AnimationStatus::Animating
    }

    pub fn is_finished(&self) -> bool {
        self.status == AnimationStatus::Finished
    }
}

/// Everything needed to mount an [`ElementAnimator`].
#[derive(Clone, Debug)]
pub struct AnimatorSpec {
    pub id: ElementId,
    pub page: PageId,
    /// Position of the element on its page; drives preview stagger.
    pub index: usize,
    pub config: ElementAnimationConfig,
    pub defaults: VisualProps,
    pub layout: StreamLayout,
    pub stream_count: usize,
    /// Mounted inside the exporter rather than the editor.
    pub export_mode: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct StreamSlot {
    run: Option<RunId>,
    counted: bool,
}

/// Animation controller for one element, grouped or tokenized.
///
/// Both variants share this state machine; they only differ in stream count and in the
/// per-stream delay (`delay + index * stagger`, where the stagger is zero for grouped elements).
#[derive(Debug)]
pub struct ElementAnimator {
    id: ElementId,
    page: PageId,
    index: usize,
    config: ElementAnimationConfig,
    defaults: VisualProps,
    layout: StreamLayout,

    status: AnimationStatus,
    direction: Option<Direction>,
    waiting_to_play: bool,
    paused: bool,
    playing: bool,

    slots: SmallVec<[StreamSlot; 1]>,
    rested: usize,
    done: Option<oneshot::Sender<()>>,
}

impl ElementAnimator {
    pub fn new(spec: AnimatorSpec) -> Self {
        let stream_count = match spec.layout {
            StreamLayout::Grouped => 1,
            StreamLayout::Tokenized(_) => spec.stream_count.max(1),
        };
        let waiting_to_play = spec.export_mode
            && !spec.config.animation_id.is_none()
            && spec.config.animate.includes(Direction::In);
        Self {
            id: spec.id,
            page: spec.page,
            index: spec.index,
            config: spec.config,
            defaults: spec.defaults,
            layout: spec.layout,
            status: AnimationStatus::Idle,
            direction: None,
            waiting_to_play,
            paused: false,
            playing: false,
            slots: SmallVec::from_elem(StreamSlot::default(), stream_count),
            rested: 0,
            done: None,
        }
    }

    /// Put every stream at the element's resting values.
    pub fn mount(&mut self, engine: &mut dyn Interpolator) {
        let rest = PropPatch::from(self.defaults.at_rest());
        for i in 0..self.slots.len() {
            engine.set(&self.key(i), &rest);
        }
    }

    /// Reset and drop every stream from the engine.
    pub fn unmount(&mut self, engine: &mut dyn Interpolator) {
        self.reset(engine, None);
        for i in 0..self.slots.len() {
            engine.release(&self.key(i));
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn page(&self) -> &PageId {
        &self.page
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &ElementAnimationConfig {
        &self.config
    }

    pub fn defaults(&self) -> &VisualProps {
        &self.defaults
    }

    pub fn layout(&self) -> StreamLayout {
        self.layout
    }

    pub fn stream_count(&self) -> usize {
        self.slots.len()
    }

    pub fn status(&self) -> ElementStatusView {
        ElementStatusView {
            status: self.status,
            direction: self.direction,
            waiting_to_play: self.waiting_to_play,
            paused: self.paused,
        }
    }

    /// Current values of every stream, in stream order.
    pub fn stream_values(&self, engine: &dyn Interpolator) -> SmallVec<[VisualProps; 1]> {
        (0..self.slots.len())
            .map(|i| engine.values(&self.key(i)).unwrap_or(self.defaults))
            .collect()
    }

    /// Speed handed to each stream; tokenized elements split `speed` across their tokens.
    pub fn stream_speed(&self, speed: Millis) -> Millis {
        match self.layout {
            StreamLayout::Grouped => speed,
            StreamLayout::Tokenized(_) => round1(speed / self.slots.len() as f64),
        }
    }

    /// Start delay of stream `index` for a play whose base delay and speed are given.
    pub fn stream_delay(&self, index: usize, base_delay: Millis, speed: Millis) -> Millis {
        let stagger = match self.layout {
            StreamLayout::Grouped => 0.0,
            StreamLayout::Tokenized(_) => self.stream_speed(speed),
        };
        base_delay.max(0.0) + index as f64 * stagger
    }

    pub fn play_in(
        &mut self,
        engine: &mut dyn Interpolator,
        props: &ElementAnimationConfig,
    ) -> PlayCompletion {
        self.play(engine, props, Direction::In)
    }

    pub fn play_out(
        &mut self,
        engine: &mut dyn Interpolator,
        props: &ElementAnimationConfig,
    ) -> PlayCompletion {
        self.play(engine, props, Direction::Out)
    }

    /// Play the element's own configuration, if its animate-set allows `direction`.
    ///
    /// Returns `None` when the direction is excluded; the element is left untouched.
    pub fn play_configured(
        &mut self,
        engine: &mut dyn Interpolator,
        direction: Direction,
    ) -> Option<PlayCompletion> {
        if self.config.animation_id.is_none() || !self.config.animate.includes(direction) {
            return None;
        }
        let props = self.config;
        Some(self.play(engine, &props, direction))
    }

    fn play(
        &mut self,
        engine: &mut dyn Interpolator,
        props: &ElementAnimationConfig,
        direction: Direction,
    ) -> PlayCompletion {
        let speed = self.stream_speed(props.speed);
        let Some(target) = motion_target(props.animation_id, direction, &self.defaults, speed)
        else {
            tracing::trace!(element = %self.id, "no animation assigned, play skipped");
            return PlayCompletion::skipped();
        };

        self.playing = true;
        self.paused = false;
        self.direction = Some(direction);
        self.status = match direction {
            Direction::In => AnimationStatus::Preparing,
            Direction::Out => AnimationStatus::Idle,
        };

        if let StreamLayout::Tokenized(writing) = self.layout {
            let patch = match direction {
                Direction::In => Some(PropPatch::opacity(0.0)),
                Direction::Out if writing == TypeWriting::Word => Some(PropPatch::offset_y(0.0)),
                Direction::Out => None,
            };
            if let Some(patch) = patch {
                for i in 0..self.slots.len() {
                    engine.set(&self.key(i), &patch);
                }
            }
        }

        for i in 0..self.slots.len() {
            let delay_ms = self.stream_delay(i, props.delay, props.speed);
            let run = engine.start(
                &self.key(i),
                StreamStart {
                    target,
                    delay_ms,
                    reset: true,
                },
            );
            self.slots[i] = StreamSlot {
                run: Some(run),
                counted: false,
            };
        }
        self.rested = 0;

        tracing::debug!(
            element = %self.id,
            ?direction,
            streams = self.slots.len(),
            delay = props.delay,
            "play"
        );
        // Replacing the sender drops the previous one, resolving it as interrupted.
        let (tx, completion) = PlayCompletion::pending();
        self.done = Some(tx);
        completion
    }

    /// Feed one engine callback. Returns `true` when the status changed.
    pub fn on_engine_event(&mut self, event: &EngineEvent) -> bool {
        let Some(slot) = self.slots.get_mut(event.key.index) else {
            return false;
        };
        if slot.run != Some(event.run) {
            tracing::trace!(element = %self.id, index = event.key.index, "stale run ignored");
            return false;
        }
        if !self.playing {
            return false;
        }

        match event.kind {
            EngineEventKind::Change(_) => false,
            EngineEventKind::Start => {
                if self.status == AnimationStatus::Animating {
                    return false;
                }
                self.status = AnimationStatus::Animating;
                self.waiting_to_play = false;
                true
            }
            EngineEventKind::Rest => {
                if slot.counted {
                    tracing::warn!(
                        element = %self.id,
                        index = event.key.index,
                        "duplicate rest ignored"
                    );
                    return false;
                }
                slot.counted = true;
                self.rested += 1;
                if self.rested < self.slots.len() {
                    return false;
                }
                self.status = match self.direction {
                    Some(Direction::Out) => AnimationStatus::Finished,
                    _ => AnimationStatus::Idle,
                };
                if let Some(tx) = self.done.take() {
                    // The caller may have dropped its completion; that is fine.
                    let _ = tx.send(());
                }
                tracing::debug!(element = %self.id, status = ?self.status, "all streams rested");
                true
            }
        }
    }

    /// Freeze every stream. No-op when already paused.
    pub fn pause(&mut self, engine: &mut dyn Interpolator) {
        if self.paused {
            return;
        }
        self.paused = true;
        for i in 0..self.slots.len() {
            engine.pause(&self.key(i));
        }
    }

    /// Unfreeze every stream. No-op when not paused.
    pub fn resume(&mut self, engine: &mut dyn Interpolator) {
        if !self.paused {
            return;
        }
        self.paused = false;
        for i in 0..self.slots.len() {
            engine.resume(&self.key(i));
        }
    }

    /// Stop all motion and snap every stream back to its resting values.
    pub fn reset(&mut self, engine: &mut dyn Interpolator, overrides: Option<&PropPatch>) {
        let mut values = self.defaults;
        if let Some(patch) = overrides {
            patch.apply(&mut values);
        }
        let rest = PropPatch::from(values.at_rest());
        for i in 0..self.slots.len() {
            let key = self.key(i);
            engine.stop(&key);
            engine.set(&key, &rest);
            self.slots[i] = StreamSlot::default();
        }
        self.status = AnimationStatus::Idle;
        self.direction = None;
        self.waiting_to_play = false;
        self.paused = false;
        self.playing = false;
        self.rested = 0;
        self.done = None;
    }

    fn key(&self, index: usize) -> StreamKey {
        StreamKey::new(self.id.clone(), index)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/element/controller.rs"]
mod tests;
