use super::*;
use crate::animation::ease::Ease;
use crate::foundation::core::ElementId;

fn key(i: usize) -> StreamKey {
    StreamKey::new(ElementId::new("e"), i)
}

fn fade(duration_ms: Millis, delay_ms: Millis) -> StreamStart {
    StreamStart {
        target: MotionTarget {
            from: VisualProps {
                opacity: 0.0,
                ..VisualProps::default()
            },
            to: VisualProps::default(),
            duration_ms,
            ease: Ease::Linear,
        },
        delay_ms,
        reset: true,
    }
}

fn kinds(events: &[EngineEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e.kind {
            EngineEventKind::Start => "start",
            EngineEventKind::Change(_) => "change",
            EngineEventKind::Rest => "rest",
        })
        .collect()
}

#[test]
fn delay_holds_the_start_back() {
    let mut eng = TweenEngine::new();
    eng.start(&key(0), fade(100.0, 50.0));
    eng.advance(40.0);
    assert!(eng.drain_events().is_empty());
    eng.advance(20.0);
    let ev = eng.drain_events();
    assert_eq!(kinds(&ev), vec!["start", "change"]);
    let v = eng.values(&key(0)).unwrap();
    assert!((v.opacity - 0.1).abs() < 1e-9);
}

#[test]
fn rest_fires_exactly_once() {
    let mut eng = TweenEngine::new();
    let run = eng.start(&key(0), fade(100.0, 0.0));
    eng.advance(250.0);
    eng.advance(250.0);
    let ev = eng.drain_events();
    let rests: Vec<_> = ev
        .iter()
        .filter(|e| e.kind == EngineEventKind::Rest)
        .collect();
    assert_eq!(rests.len(), 1);
    assert_eq!(rests[0].run, run);
    assert_eq!(eng.values(&key(0)).unwrap().opacity, 1.0);
}

#[test]
fn reset_start_silences_the_interrupted_run() {
    let mut eng = TweenEngine::new();
    let first = eng.start(&key(0), fade(100.0, 0.0));
    eng.advance(50.0);
    let second = eng.start(&key(0), fade(100.0, 0.0));
    eng.advance(200.0);
    let ev = eng.drain_events();
    assert!(
        ev.iter()
            .all(|e| !(e.run == first && e.kind == EngineEventKind::Rest))
    );
    assert!(
        ev.iter()
            .any(|e| e.run == second && e.kind == EngineEventKind::Rest)
    );
}

#[test]
fn stop_cancels_without_rest() {
    let mut eng = TweenEngine::new();
    eng.start(&key(0), fade(100.0, 0.0));
    eng.advance(10.0);
    eng.stop(&key(0));
    eng.advance(500.0);
    let ev = eng.drain_events();
    assert!(ev.iter().all(|e| e.kind != EngineEventKind::Rest));
    assert!(!eng.is_busy());
}

#[test]
fn paused_streams_do_not_advance() {
    let mut eng = TweenEngine::new();
    eng.start(&key(0), fade(100.0, 0.0));
    eng.advance(10.0);
    eng.pause(&key(0));
    eng.pause(&key(0));
    let before = eng.values(&key(0)).unwrap();
    eng.advance(500.0);
    assert_eq!(eng.values(&key(0)).unwrap(), before);
    eng.resume(&key(0));
    eng.advance(500.0);
    assert_eq!(eng.values(&key(0)).unwrap().opacity, 1.0);
}

#[test]
fn zero_duration_rests_on_first_step() {
    let mut eng = TweenEngine::new();
    eng.start(&key(0), fade(0.0, 0.0));
    eng.advance(0.0);
    assert_eq!(kinds(&eng.drain_events()), vec!["start", "change", "rest"]);
}

#[test]
fn set_is_instant_and_silent() {
    let mut eng = TweenEngine::new();
    eng.set(&key(1), &PropPatch::opacity(0.25));
    assert_eq!(eng.values(&key(1)).unwrap().opacity, 0.25);
    assert!(eng.drain_events().is_empty());
}

#[test]
fn reset_start_shows_from_values_during_delay() {
    let mut eng = TweenEngine::new();
    eng.set(&key(0), &PropPatch::opacity(1.0));
    eng.start(&key(0), fade(100.0, 200.0));
    assert_eq!(eng.values(&key(0)).unwrap().opacity, 0.0);
    eng.advance(100.0);
    assert_eq!(eng.values(&key(0)).unwrap().opacity, 0.0);
}
