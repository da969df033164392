//! The stage: one engine, one sequencer and every mounted element controller.
//!
//! All mutation happens on the caller's thread. Sequencer changes are published by
//! [`Stage::dispatch`] to every controller in mount order, and engine callbacks are routed back
//! to their controller one at a time by [`Stage::advance`].

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::animation::props::{AnimationOverrides, Direction, ElementAnimationConfig, VisualProps};
use crate::element::completion::{PageCompletion, PlayCompletion, join_completions};
use crate::element::controller::{AnimatorSpec, ElementAnimator, ElementStatusView};
use crate::engine::{Interpolator, TweenEngine};
use crate::foundation::core::{ElementId, Millis, PageId};
use crate::sequencer::reaction::{ElementView, Reaction, decide};
use crate::sequencer::{PageSequencer, PreviewMode, PreviewRequest, SequencingState};

/// Quiet period before a preview request fires; a newer request within it replaces it.
pub const PREVIEW_DEBOUNCE_MS: Millis = 200.0;

/// Straight-alpha RGBA8 fill colour.
pub type Rgba8 = [u8; 4];

/// Everything the stage needs to mount one element.
#[derive(Clone, Debug)]
pub struct ElementMount {
    pub animator: AnimatorSpec,
    /// The element belongs to a group box that animates it; it ignores previews.
    pub inside_group_box: bool,
    pub fill: Rgba8,
}

/// Visual state of one element at the current instant.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementVisual {
    pub id: ElementId,
    pub fill: Rgba8,
    /// Per-stream values in stream order; tokenized text has one entry per token.
    pub streams: SmallVec<[VisualProps; 1]>,
    pub status: ElementStatusView,
}

/// Everything a capture surface needs to draw one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneSnapshot {
    pub page: Option<PageId>,
    pub time_ms: Millis,
    /// Elements of the active page in mount (paint) order.
    pub elements: Vec<ElementVisual>,
}

#[derive(Clone, Copy, Debug)]
struct PendingPreview {
    fire_at: Millis,
    config: ElementAnimationConfig,
}

#[derive(Debug)]
struct StageElement {
    animator: ElementAnimator,
    inside_group_box: bool,
    fill: Rgba8,
    pending_preview: Option<PendingPreview>,
    previewing: bool,
}

/// Owner of the interpolation engine, the page sequencer and all element controllers.
#[derive(Debug)]
pub struct Stage<E: Interpolator = TweenEngine> {
    engine: E,
    sequencer: PageSequencer,
    elements: Vec<StageElement>,
    by_id: HashMap<ElementId, usize>,
    now_ms: Millis,
}

impl Stage<TweenEngine> {
    pub fn new() -> Self {
        Self::with_engine(TweenEngine::new())
    }
}

impl Default for Stage<TweenEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Interpolator> Stage<E> {
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            sequencer: PageSequencer::new(),
            elements: Vec::new(),
            by_id: HashMap::new(),
            now_ms: 0.0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sequencing(&self) -> &SequencingState {
        self.sequencer.state()
    }

    /// Stage time in ms; only [`Stage::advance`] moves it.
    pub fn now_ms(&self) -> Millis {
        self.now_ms
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Mount the elements of one page. An element id that is already mounted is replaced.
    pub fn mount_page(&mut self, elements: impl IntoIterator<Item = ElementMount>) {
        for mount in elements {
            if let Some(&slot) = self.by_id.get(&mount.animator.id) {
                self.elements[slot].animator.unmount(&mut self.engine);
                self.elements.remove(slot);
                self.reindex();
            }
            let mut animator = ElementAnimator::new(mount.animator);
            animator.mount(&mut self.engine);
            tracing::debug!(element = %animator.id(), page = %animator.page(), "mount");
            self.by_id.insert(animator.id().clone(), self.elements.len());
            self.elements.push(StageElement {
                animator,
                inside_group_box: mount.inside_group_box,
                fill: mount.fill,
                pending_preview: None,
                previewing: false,
            });
        }
    }

    /// Reset and drop every element of `page`.
    pub fn unmount_page(&mut self, page: &PageId) {
        let engine = &mut self.engine;
        self.elements.retain_mut(|el| {
            if el.animator.page() != page {
                return true;
            }
            el.animator.unmount(engine);
            false
        });
        self.reindex();
    }

    fn reindex(&mut self) {
        self.by_id = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, el)| (el.animator.id().clone(), i))
            .collect();
    }

    pub fn activate_page(&mut self, page: Option<PageId>) {
        self.sequencer.set_active_page(page);
        let _ = self.dispatch();
    }

    /// Drive every element of the active page in `direction`.
    ///
    /// The returned completion resolves once every element this request started has finished
    /// or been interrupted; elements that do not animate in `direction` are not waited on.
    #[tracing::instrument(skip(self))]
    pub fn play_page(&mut self, direction: Direction) -> PageCompletion {
        self.sequencer.play(direction);
        let started = self.dispatch();
        tracing::debug!(elements = started.len(), "page play dispatched");
        join_completions(started)
    }

    /// Stop page playback; every element of the active page is reset.
    pub fn stop_page(&mut self) {
        self.sequencer.stop();
        let _ = self.dispatch();
    }

    pub fn reset_current(&mut self) {
        self.sequencer.reset_current();
        let _ = self.dispatch();
    }

    pub fn reset_all(&mut self) {
        self.sequencer.reset_all();
        let _ = self.dispatch();
    }

    pub fn set_preview_mode(&mut self, on: bool) {
        self.sequencer.set_preview_mode(on);
        let _ = self.dispatch();
    }

    pub fn focus_element(&mut self, element: Option<ElementId>) {
        self.sequencer.focus_element(element);
    }

    pub fn request_preview(&mut self, request: PreviewRequest) {
        self.sequencer.request_preview(request);
        let _ = self.dispatch();
    }

    /// Convenience for previewing the whole active page with `properties`.
    pub fn preview_page(&mut self, properties: AnimationOverrides) {
        self.request_preview(PreviewRequest {
            mode: PreviewMode::Page,
            target: None,
            properties,
        });
    }

    /// Publish pending sequencer changes and apply every element's reaction.
    ///
    /// Returns the completions of page playback started by this revision.
    pub fn dispatch(&mut self) -> Vec<PlayCompletion> {
        let Some(update) = self.sequencer.publish() else {
            return Vec::new();
        };
        tracing::trace!(revision = update.revision, changes = ?update.changes, "sequencer update");

        let page_play_started = update.changes.playback && update.state.is_page_playing;
        let mut started = Vec::new();
        for el in &mut self.elements {
            let preview_superseded = update.changes.preview || page_play_started;
            if preview_superseded && (el.pending_preview.is_some() || el.previewing) {
                el.pending_preview = None;
                el.previewing = false;
                el.animator.reset(&mut self.engine, None);
            }

            let view = ElementView {
                id: el.animator.id(),
                page: el.animator.page(),
                index: el.animator.index(),
                config: el.animator.config(),
                inside_group_box: el.inside_group_box,
            };
            match decide(&update, &view) {
                Reaction::Keep => {}
                Reaction::Reset => {
                    el.pending_preview = None;
                    el.previewing = false;
                    el.animator.reset(&mut self.engine, None);
                }
                Reaction::Play(direction) => {
                    if let Some(done) = el.animator.play_configured(&mut self.engine, direction) {
                        started.push(done);
                    }
                }
                Reaction::Preview { config, delay } => {
                    el.pending_preview = Some(PendingPreview {
                        fire_at: self.now_ms + PREVIEW_DEBOUNCE_MS,
                        config: ElementAnimationConfig { delay, ..config },
                    });
                }
            }
        }
        started
    }

    /// Advance stage time by `dt_ms`, firing due previews and routing engine callbacks.
    ///
    /// The engine step is split at every preview due time inside the window, so a preview
    /// only accumulates the time that passed after it fired.
    pub fn advance(&mut self, dt_ms: Millis) {
        let end = self.now_ms + dt_ms.max(0.0);
        while let Some(fire_at) = self.next_preview_due(end) {
            self.step_to(fire_at);
            self.fire_due_previews();
        }
        self.step_to(end);
    }

    /// Earliest pending preview due at or before `end`. Page playback holds previews back.
    fn next_preview_due(&self, end: Millis) -> Option<Millis> {
        if self.sequencer.state().is_page_playing {
            return None;
        }
        self.elements
            .iter()
            .filter_map(|el| el.pending_preview.map(|p| p.fire_at))
            .filter(|&at| at <= end)
            .min_by(f64::total_cmp)
    }

    fn step_to(&mut self, t: Millis) {
        let dt = t - self.now_ms;
        if dt > 0.0 {
            self.engine.advance(dt);
            self.now_ms = t;
        }
        self.route_events();
    }

    fn fire_due_previews(&mut self) {
        for el in &mut self.elements {
            let Some(pending) = el.pending_preview else {
                continue;
            };
            if pending.fire_at > self.now_ms {
                continue;
            }
            el.pending_preview = None;
            el.previewing = true;
            tracing::debug!(element = %el.animator.id(), at = self.now_ms, "preview fired");
            // Preview completions are not awaited by anyone.
            drop(el.animator.play_in(&mut self.engine, &pending.config));
        }
    }

    fn route_events(&mut self) {
        for event in self.engine.drain_events() {
            let Some(&slot) = self.by_id.get(&event.key.element) else {
                continue;
            };
            self.elements[slot].animator.on_engine_event(&event);
        }
    }

    pub fn pause_all(&mut self) {
        for el in &mut self.elements {
            el.animator.pause(&mut self.engine);
        }
    }

    pub fn resume_all(&mut self) {
        for el in &mut self.elements {
            el.animator.resume(&mut self.engine);
        }
    }

    pub fn element_status(&self, id: &ElementId) -> Option<ElementStatusView> {
        self.by_id
            .get(id)
            .map(|&slot| self.elements[slot].animator.status())
    }

    pub fn has_pending_preview(&self) -> bool {
        self.elements.iter().any(|el| el.pending_preview.is_some())
    }

    /// Whether any element is still preparing or animating.
    pub fn is_animating(&self) -> bool {
        self.elements.iter().any(|el| {
            let status = el.animator.status();
            status.is_preparing() || status.is_animating()
        })
    }

    /// Visual state of the active page.
    pub fn snapshot(&self) -> SceneSnapshot {
        let page = self.sequencer.state().active_page.clone();
        let elements = self
            .elements
            .iter()
            .filter(|el| page.as_ref() == Some(el.animator.page()))
            .map(|el| ElementVisual {
                id: el.animator.id().clone(),
                fill: el.fill,
                streams: el.animator.stream_values(&self.engine),
                status: el.animator.status(),
            })
            .collect();
        SceneSnapshot {
            page,
            time_ms: self.now_ms,
            elements,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/mod.rs"]
mod tests;
