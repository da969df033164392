use super::*;

#[test]
fn publish_is_empty_without_changes() {
    let mut seq = PageSequencer::new();
    assert!(seq.publish().is_none());
    seq.focus_element(Some(ElementId::new("a")));
    assert!(seq.publish().is_none());
}

#[test]
fn reset_signals_are_pulses() {
    let mut seq = PageSequencer::new();
    seq.reset_all();
    let update = seq.publish().unwrap();
    assert!(update.state.force_reset_all);
    assert!(update.changes.reset);
    assert!(!seq.state().force_reset_all);
    assert!(seq.publish().is_none());
}

#[test]
fn reset_all_clears_preview_and_playback() {
    let mut seq = PageSequencer::new();
    seq.set_preview_mode(true);
    seq.request_preview(PreviewRequest {
        mode: PreviewMode::Page,
        target: None,
        properties: AnimationOverrides::default(),
    });
    seq.play(Direction::In);
    seq.reset_all();
    let update = seq.publish().unwrap();
    assert!(update.state.preview.is_none());
    assert!(!update.state.is_page_playing);
    assert_eq!(update.state.play_direction, PlayDirection::Idle);
}

#[test]
fn active_page_change_remembers_previous_page() {
    let mut seq = PageSequencer::new();
    seq.set_active_page(Some(PageId::new("a")));
    let first = seq.publish().unwrap();
    assert_eq!(first.previous_page, None);

    seq.set_active_page(Some(PageId::new("b")));
    seq.set_active_page(Some(PageId::new("c")));
    let second = seq.publish().unwrap();
    assert_eq!(second.previous_page, Some(PageId::new("a")));
    assert_eq!(second.state.active_page, Some(PageId::new("c")));
    assert!(second.revision > first.revision);
}

#[test]
fn play_direction_maps_to_element_direction() {
    assert_eq!(PlayDirection::In.as_direction(), Some(Direction::In));
    assert_eq!(PlayDirection::Idle.as_direction(), None);
}
