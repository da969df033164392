use super::*;
use crate::animation::props::{AnimateSet, AnimationId, PropPatch};
use crate::element::completion::PlayOutcome;
use crate::element::controller::{AnimationStatus, StreamLayout};
use crate::engine::{EngineEvent, RunId, StreamKey, StreamStart};
use futures::FutureExt as _;

#[derive(Default)]
struct CountingEngine {
    inner: TweenEngine,
    starts: Vec<(StreamKey, StreamStart)>,
}

impl Interpolator for CountingEngine {
    fn start(&mut self, key: &StreamKey, cfg: StreamStart) -> RunId {
        self.starts.push((key.clone(), cfg));
        self.inner.start(key, cfg)
    }
    fn stop(&mut self, key: &StreamKey) {
        self.inner.stop(key);
    }
    fn pause(&mut self, key: &StreamKey) {
        self.inner.pause(key);
    }
    fn resume(&mut self, key: &StreamKey) {
        self.inner.resume(key);
    }
    fn set(&mut self, key: &StreamKey, patch: &PropPatch) {
        self.inner.set(key, patch);
    }
    fn values(&self, key: &StreamKey) -> Option<VisualProps> {
        self.inner.values(key)
    }
    fn release(&mut self, key: &StreamKey) {
        self.inner.release(key);
    }
    fn advance(&mut self, dt_ms: Millis) {
        self.inner.advance(dt_ms);
    }
    fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.inner.drain_events()
    }
}

fn shape(id: &str, page: &str, index: usize, animate: AnimateSet, speed: Millis) -> ElementMount {
    ElementMount {
        animator: AnimatorSpec {
            id: ElementId::new(id),
            page: PageId::new(page),
            index,
            config: ElementAnimationConfig {
                animation_id: AnimationId::Fade,
                animate,
                speed,
                delay: 0.0,
            },
            defaults: VisualProps {
                width: 100.0,
                height: 40.0,
                ..VisualProps::default()
            },
            layout: StreamLayout::Grouped,
            stream_count: 1,
            export_mode: false,
        },
        inside_group_box: false,
        fill: [255, 0, 0, 255],
    }
}

fn stage_with(elements: Vec<ElementMount>) -> Stage<CountingEngine> {
    let mut stage = Stage::with_engine(CountingEngine::default());
    stage.mount_page(elements);
    stage.activate_page(Some(PageId::new("p1")));
    stage
}

fn run_for(stage: &mut Stage<CountingEngine>, total_ms: Millis, step_ms: Millis) {
    let mut t = 0.0;
    while t < total_ms {
        stage.advance(step_ms);
        t += step_ms;
    }
}

fn element_preview(speed: Millis) -> PreviewRequest {
    PreviewRequest {
        mode: PreviewMode::Element,
        target: Some(ElementId::new("a")),
        properties: AnimationOverrides {
            animation_id: Some(AnimationId::Rise),
            speed: Some(speed),
            ..AnimationOverrides::default()
        },
    }
}

#[test]
fn preview_requests_within_debounce_window_play_once() {
    let mut stage = stage_with(vec![shape("a", "p1", 0, AnimateSet::Enter, 1000.0)]);
    stage.set_preview_mode(true);

    stage.request_preview(element_preview(300.0));
    stage.advance(50.0);
    stage.request_preview(element_preview(500.0));
    assert!(stage.has_pending_preview());
    run_for(&mut stage, 1000.0, 50.0);

    let starts = &stage.engine().starts;
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].1.target.duration_ms, 500.0);
    assert!(!stage.has_pending_preview());
}

#[test]
fn page_preview_fans_out_with_index_stagger() {
    let mut stage = stage_with(vec![
        shape("a", "p1", 0, AnimateSet::Enter, 400.0),
        shape("b", "p1", 1, AnimateSet::Enter, 400.0),
        shape("c", "p2", 0, AnimateSet::Enter, 400.0),
    ]);
    stage.set_preview_mode(true);
    stage.preview_page(AnimationOverrides {
        animation_id: Some(AnimationId::Zoom),
        ..AnimationOverrides::default()
    });
    run_for(&mut stage, 250.0, 50.0);

    let delays: Vec<(String, Millis)> = stage
        .engine()
        .starts
        .iter()
        .map(|(key, cfg)| (key.element.to_string(), cfg.delay_ms))
        .collect();
    assert_eq!(delays, vec![("a".to_owned(), 0.0), ("b".to_owned(), 200.0)]);
}

#[test]
fn reset_all_wins_over_play_in_same_revision() {
    let mut stage = stage_with(vec![shape("a", "p1", 0, AnimateSet::Both, 300.0)]);
    stage.sequencer.play(Direction::In);
    stage.sequencer.reset_all();
    let started = stage.dispatch();
    assert!(started.is_empty());

    run_for(&mut stage, 600.0, 16.0);
    let status = stage.element_status(&ElementId::new("a")).unwrap();
    assert_eq!(status.status, AnimationStatus::Idle);
    assert!(stage.engine().starts.is_empty());
}

#[test]
fn page_completion_waits_for_every_started_element() {
    let mut stage = stage_with(vec![
        shape("a", "p1", 0, AnimateSet::Enter, 300.0),
        shape("b", "p1", 1, AnimateSet::Both, 600.0),
        shape("c", "p1", 2, AnimateSet::Exit, 600.0),
    ]);
    let mut done = stage.play_page(Direction::In);

    run_for(&mut stage, 320.0, 16.0);
    assert!((&mut done).now_or_never().is_none());
    assert!(stage.is_animating());

    run_for(&mut stage, 400.0, 16.0);
    let outcomes = done.now_or_never().unwrap();
    assert_eq!(outcomes, vec![PlayOutcome::Finished, PlayOutcome::Finished]);
    assert!(!stage.is_animating());
}

#[test]
fn play_out_leaves_elements_finished_until_reset() {
    let mut stage = stage_with(vec![shape("a", "p1", 0, AnimateSet::Exit, 200.0)]);
    let done = stage.play_page(Direction::Out);
    run_for(&mut stage, 400.0, 20.0);
    assert_eq!(
        futures::executor::block_on(done),
        vec![PlayOutcome::Finished]
    );
    let id = ElementId::new("a");
    assert!(stage.element_status(&id).unwrap().is_finished());
    assert_eq!(stage.snapshot().elements[0].streams[0].opacity, 0.0);

    stage.reset_current();
    assert_eq!(stage.element_status(&id).unwrap().status, AnimationStatus::Idle);
    assert_eq!(stage.snapshot().elements[0].streams[0].opacity, 1.0);
}

#[test]
fn stop_page_interrupts_and_resets() {
    let mut stage = stage_with(vec![shape("a", "p1", 0, AnimateSet::Enter, 1000.0)]);
    let done = stage.play_page(Direction::In);
    run_for(&mut stage, 100.0, 20.0);
    stage.stop_page();

    assert_eq!(done.now_or_never().unwrap(), vec![PlayOutcome::Interrupted]);
    assert!(!stage.sequencing().is_page_playing);
    assert!(!stage.is_animating());
}

#[test]
fn page_play_cancels_a_preview_still_in_debounce() {
    let mut stage = stage_with(vec![shape("a", "p1", 0, AnimateSet::Enter, 1000.0)]);
    stage.set_preview_mode(true);
    stage.request_preview(element_preview(300.0));
    assert!(stage.has_pending_preview());

    let mut done = stage.play_page(Direction::In);
    assert!(!stage.has_pending_preview());
    run_for(&mut stage, 400.0, 20.0);
    assert!((&mut done).now_or_never().is_none());

    run_for(&mut stage, 700.0, 20.0);
    let durations: Vec<Millis> = stage
        .engine()
        .starts
        .iter()
        .map(|(_, cfg)| cfg.target.duration_ms)
        .collect();
    assert_eq!(durations, vec![1000.0]);
    assert_eq!(done.now_or_never().unwrap(), vec![PlayOutcome::Finished]);
}

#[test]
fn preview_only_counts_time_after_it_fires() {
    let mut stage = stage_with(vec![shape("a", "p1", 0, AnimateSet::Enter, 400.0)]);
    stage.set_preview_mode(true);
    stage.request_preview(PreviewRequest {
        mode: PreviewMode::Element,
        target: Some(ElementId::new("a")),
        properties: AnimationOverrides {
            animation_id: Some(AnimationId::Fade),
            speed: Some(1000.0),
            ..AnimationOverrides::default()
        },
    });

    stage.advance(1000.0);
    let id = ElementId::new("a");
    assert!(stage.element_status(&id).unwrap().is_animating());
    let opacity = stage.snapshot().elements[0].streams[0].opacity;
    assert!((opacity - 0.8).abs() < 1e-6, "opacity {opacity}");

    stage.advance(200.0);
    assert_eq!(stage.element_status(&id).unwrap().status, AnimationStatus::Idle);
    assert_eq!(stage.snapshot().elements[0].streams[0].opacity, 1.0);
}

#[test]
fn snapshot_only_shows_active_page() {
    let mut stage = stage_with(vec![
        shape("a", "p1", 0, AnimateSet::Enter, 100.0),
        shape("b", "p2", 0, AnimateSet::Enter, 100.0),
    ]);
    let snap = stage.snapshot();
    assert_eq!(snap.page, Some(PageId::new("p1")));
    assert_eq!(snap.elements.len(), 1);
    assert_eq!(snap.elements[0].id, ElementId::new("a"));

    stage.unmount_page(&PageId::new("p1"));
    assert_eq!(stage.element_count(), 1);
    assert!(stage.element_status(&ElementId::new("a")).is_none());
    assert!(stage.snapshot().elements.is_empty());
}

#[test]
fn pause_all_freezes_progress() {
    let mut stage = stage_with(vec![shape("a", "p1", 0, AnimateSet::Enter, 200.0)]);
    let mut done = stage.play_page(Direction::In);
    run_for(&mut stage, 100.0, 20.0);
    stage.pause_all();
    run_for(&mut stage, 500.0, 20.0);
    assert!((&mut done).now_or_never().is_none());
    assert!(stage.element_status(&ElementId::new("a")).unwrap().paused);

    stage.resume_all();
    run_for(&mut stage, 200.0, 20.0);
    assert_eq!(done.now_or_never().unwrap(), vec![PlayOutcome::Finished]);
}
