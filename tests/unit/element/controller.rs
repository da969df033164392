use super::*;
use crate::animation::props::{AnimateSet, AnimationId};
use crate::element::completion::PlayOutcome;
use crate::engine::TweenEngine;
use futures::FutureExt as _;

/// Wraps the tween engine and records every call the controller makes.
#[derive(Default)]
struct RecordingEngine {
    inner: TweenEngine,
    starts: Vec<(StreamKey, StreamStart, RunId)>,
    pauses: usize,
    stops: usize,
}

impl Interpolator for RecordingEngine {
    fn start(&mut self, key: &StreamKey, cfg: StreamStart) -> RunId {
        let run = self.inner.start(key, cfg);
        self.starts.push((key.clone(), cfg, run));
        run
    }
    fn stop(&mut self, key: &StreamKey) {
        self.stops += 1;
        self.inner.stop(key);
    }
    fn pause(&mut self, key: &StreamKey) {
        self.pauses += 1;
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

fn config(id: AnimationId) -> ElementAnimationConfig {
    ElementAnimationConfig {
        animation_id: id,
        animate: AnimateSet::Both,
        speed: 600.0,
        delay: 100.0,
    }
}

fn text_animator(tokens: usize, export_mode: bool) -> ElementAnimator {
    ElementAnimator::new(AnimatorSpec {
        id: ElementId::new("title"),
        page: PageId::new("p1"),
        index: 0,
        config: config(AnimationId::Rise),
        defaults: VisualProps {
            width: 200.0,
            height: 50.0,
            ..VisualProps::default()
        },
        layout: StreamLayout::Tokenized(TypeWriting::Character),
        stream_count: tokens,
        export_mode,
    })
}

fn shape_animator(id: AnimationId) -> ElementAnimator {
    ElementAnimator::new(AnimatorSpec {
        id: ElementId::new("box"),
        page: PageId::new("p1"),
        index: 2,
        config: config(id),
        defaults: VisualProps::default(),
        layout: StreamLayout::Grouped,
        stream_count: 7,
        export_mode: false,
    })
}

fn event(anim: &ElementAnimator, index: usize, run: RunId, kind: EngineEventKind) -> EngineEvent {
    EngineEvent {
        key: StreamKey::new(anim.id().clone(), index),
        run,
        kind,
    }
}

#[test]
fn tokenized_play_in_starts_one_stream_per_token_with_increasing_delays() {
    let mut eng = RecordingEngine::default();
    let mut anim = text_animator(6, false);
    let _done = anim.play_in(&mut eng, &config(AnimationId::Rise));

    assert_eq!(eng.starts.len(), 6);
    // 600 / 6 = 100 per token.
    let delays: Vec<f64> = eng.starts.iter().map(|(_, c, _)| c.delay_ms).collect();
    assert_eq!(delays, vec![100.0, 200.0, 300.0, 400.0, 500.0, 600.0]);
    let indices: Vec<usize> = eng.starts.iter().map(|(k, _, _)| k.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    assert!(eng.starts.iter().all(|(_, c, _)| c.reset));
    assert_eq!(anim.status().status, AnimationStatus::Preparing);
}

#[test]
fn per_token_speed_is_rounded_to_one_decimal() {
    let anim = text_animator(3, false);
    assert_eq!(anim.stream_speed(1000.0), 333.3);
    assert_eq!(anim.stream_delay(2, 0.0, 1000.0), 666.6);
}

#[test]
fn grouped_element_has_a_single_unstaggered_stream() {
    let mut eng = RecordingEngine::default();
    let mut anim = shape_animator(AnimationId::Fade);
    assert_eq!(anim.stream_count(), 1);
    let _done = anim.play_in(&mut eng, &config(AnimationId::Fade));
    assert_eq!(eng.starts.len(), 1);
    assert_eq!(eng.starts[0].1.delay_ms, 100.0);
    assert_eq!(eng.starts[0].1.target.duration_ms, 600.0);
}

#[test]
fn finished_only_after_every_stream_rests_in_any_order() {
    let mut eng = RecordingEngine::default();
    let mut anim = text_animator(3, false);
    let mut done = anim.play_out(&mut eng, &config(AnimationId::Rise));
    let runs: Vec<RunId> = eng.starts.iter().map(|(_, _, r)| *r).collect();

    assert!(anim.on_engine_event(&event(&anim, 0, runs[0], EngineEventKind::Start)));
    assert!(anim.status().is_animating());

    // Later streams finish first.
    anim.on_engine_event(&event(&anim, 2, runs[2], EngineEventKind::Rest));
    anim.on_engine_event(&event(&anim, 1, runs[1], EngineEventKind::Rest));
    assert!(anim.status().is_animating());
    assert!((&mut done).now_or_never().is_none());

    assert!(anim.on_engine_event(&event(&anim, 0, runs[0], EngineEventKind::Rest)));
    assert!(anim.status().is_finished());
    assert_eq!(done.now_or_never(), Some(PlayOutcome::Finished));
}

#[test]
fn duplicate_rest_is_counted_once() {
    let mut eng = RecordingEngine::default();
    let mut anim = text_animator(2, false);
    let mut done = anim.play_in(&mut eng, &config(AnimationId::Rise));
    let runs: Vec<RunId> = eng.starts.iter().map(|(_, _, r)| *r).collect();

    anim.on_engine_event(&event(&anim, 0, runs[0], EngineEventKind::Start));
    anim.on_engine_event(&event(&anim, 0, runs[0], EngineEventKind::Rest));
    anim.on_engine_event(&event(&anim, 0, runs[0], EngineEventKind::Rest));
    assert!(anim.status().is_animating());
    assert!((&mut done).now_or_never().is_none());

    anim.on_engine_event(&event(&anim, 1, runs[1], EngineEventKind::Rest));
    assert_eq!(anim.status().status, AnimationStatus::Idle);
    assert_eq!(done.now_or_never(), Some(PlayOutcome::Finished));
}

#[test]
fn stale_run_events_are_ignored() {
    let mut eng = RecordingEngine::default();
    let mut anim = shape_animator(AnimationId::Fade);
    let _first = anim.play_in(&mut eng, &config(AnimationId::Fade));
    let old = eng.starts[0].2;
    let _second = anim.play_in(&mut eng, &config(AnimationId::Fade));
    assert!(!anim.on_engine_event(&event(&anim, 0, old, EngineEventKind::Start)));
    assert!(anim.status().is_preparing());
}

#[test]
fn real_engine_drives_full_enter_cycle() {
    let mut eng = TweenEngine::new();
    let mut anim = text_animator(4, true);
    assert!(anim.status().waiting_to_play);
    let done = anim.play_in(&mut eng, &config(AnimationId::Rise));

    let mut saw_animating = false;
    for _ in 0..100 {
        eng.advance(16.0);
        for ev in eng.drain_events() {
            anim.on_engine_event(&ev);
        }
        saw_animating |= anim.status().is_animating();
    }
    assert!(saw_animating);
    assert!(!anim.status().waiting_to_play);
    assert_eq!(anim.status().status, AnimationStatus::Idle);
    assert_eq!(done.now_or_never(), Some(PlayOutcome::Finished));
    let values = anim.stream_values(&eng);
    assert!(values.iter().all(|v| (v.opacity - 1.0).abs() < 1e-9));
}

#[test]
fn none_animation_is_a_silent_no_op() {
    let mut eng = RecordingEngine::default();
    let mut anim = shape_animator(AnimationId::None);
    let done = anim.play_in(&mut eng, &config(AnimationId::None));
    assert!(eng.starts.is_empty());
    assert_eq!(anim.status().status, AnimationStatus::Idle);
    assert_eq!(done.now_or_never(), Some(PlayOutcome::Skipped));
    assert!(anim.play_configured(&mut eng, Direction::In).is_none());
}

#[test]
fn play_configured_respects_animate_set() {
    let mut eng = RecordingEngine::default();
    let mut anim = ElementAnimator::new(AnimatorSpec {
        config: ElementAnimationConfig {
            animate: AnimateSet::Enter,
            ..config(AnimationId::Fade)
        },
        ..AnimatorSpec {
            id: ElementId::new("e"),
            page: PageId::new("p"),
            index: 0,
            config: config(AnimationId::Fade),
            defaults: VisualProps::default(),
            layout: StreamLayout::Grouped,
            stream_count: 1,
            export_mode: false,
        }
    });
    assert!(anim.play_configured(&mut eng, Direction::Out).is_none());
    assert!(eng.starts.is_empty());
    assert!(anim.play_configured(&mut eng, Direction::In).is_some());
    assert_eq!(eng.starts.len(), 1);
}

#[test]
fn reset_is_idempotent_and_interrupts_pending_play() {
    let mut eng = RecordingEngine::default();
    let mut anim = text_animator(3, true);
    let done = anim.play_in(&mut eng, &config(AnimationId::Rise));
    eng.advance(250.0);
    for ev in eng.drain_events() {
        anim.on_engine_event(&ev);
    }

    anim.reset(&mut eng, None);
    let once = (anim.status(), anim.stream_values(&eng));
    anim.reset(&mut eng, None);
    let twice = (anim.status(), anim.stream_values(&eng));
    assert_eq!(once, twice);
    assert_eq!(once.0.status, AnimationStatus::Idle);
    assert_eq!(once.0.direction, None);
    assert!(!once.0.waiting_to_play);
    assert!(once.1.iter().all(|v| *v == anim.defaults().at_rest()));
    assert_eq!(done.now_or_never(), Some(PlayOutcome::Interrupted));

    // Nothing moves after a reset.
    eng.advance(5000.0);
    assert!(eng.drain_events().is_empty());
}

#[test]
fn reset_applies_overrides_with_zero_offset() {
    let mut eng = RecordingEngine::default();
    let mut anim = shape_animator(AnimationId::Fade);
    let patch = PropPatch {
        opacity: Some(0.5),
        offset_x: Some(40.0),
        ..PropPatch::default()
    };
    anim.reset(&mut eng, Some(&patch));
    let v = anim.stream_values(&eng)[0];
    assert_eq!(v.opacity, 0.5);
    assert_eq!(v.offset_x, 0.0);
}

#[test]
fn pause_and_resume_are_idempotent() {
    let mut eng = RecordingEngine::default();
    let mut anim = text_animator(3, false);
    let _done = anim.play_in(&mut eng, &config(AnimationId::Rise));
    anim.pause(&mut eng);
    anim.pause(&mut eng);
    assert_eq!(eng.pauses, 3);
    assert!(anim.status().paused);
    anim.resume(&mut eng);
    anim.resume(&mut eng);
    assert!(!anim.status().paused);
}
