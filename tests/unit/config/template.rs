use super::*;
use crate::animation::props::AnimationId;

const TEMPLATE: &str = r#"{
    "template_id": "t-1",
    "size_id": "square",
    "width": 1080,
    "height": 1080,
    "pages": [{
        "id": "p1",
        "elements": [
            {
                "id": "bg",
                "type": "shape",
                "fill": [20, 20, 20, 255],
                "frame": { "x": 0, "y": 0, "width": 1080, "height": 1080 }
            },
            {
                "id": "title",
                "type": "text",
                "text": "Hello big world",
                "writing": "word",
                "fill": [255, 255, 255, 255],
                "frame": { "x": 100, "y": 100, "width": 600, "height": 120 },
                "animation": { "animation_id": "rise", "animate": "both", "speed": 900, "delay": 300 }
            },
            {
                "id": "clip",
                "type": "video",
                "fill": [0, 0, 255, 255],
                "frame": { "x": 0, "y": 600, "width": 400, "height": 300 },
                "src": "clip.wav",
                "inside_group_box": true
            }
        ]
    }]
}"#;

fn doc() -> TemplateDoc {
    TemplateDoc::from_json_str(TEMPLATE).unwrap()
}

#[test]
fn parses_elements_and_animation_config() {
    let doc = doc();
    assert!(doc.validate().is_ok());
    assert!(doc.require_identifiers().is_ok());
    let page = &doc.pages[0];
    assert_eq!(page.elements.len(), 3);
    let title = &page.elements[1];
    assert_eq!(title.animation.animation_id, AnimationId::Rise);
    assert_eq!(title.frame.opacity, 1.0);
    assert!(matches!(
        &title.kind,
        ElementKind::Text { writing: TypeWriting::Word, .. }
    ));
    assert!(page.elements[2].inside_group_box);
}

#[test]
fn page_mounts_split_text_into_word_streams() {
    let doc = doc();
    let mounts = doc.page_mounts(&doc.pages[0], CanvasMode::Exporter);
    assert_eq!(mounts.len(), 3);
    assert_eq!(mounts[0].animator.layout, StreamLayout::Grouped);
    assert_eq!(
        mounts[1].animator.layout,
        StreamLayout::Tokenized(TypeWriting::Word)
    );
    assert_eq!(mounts[1].animator.stream_count, 3);
    assert_eq!(mounts[1].animator.index, 1);
    assert!(mounts[1].animator.export_mode);
    assert!(mounts[2].inside_group_box);
    assert_eq!(mounts[2].fill, [0, 0, 255, 255]);
}

#[test]
fn duration_falls_back_to_longest_enter_animation() {
    let mut doc = doc();
    assert_eq!(doc.effective_duration_ms(), 1200.0);
    doc.duration_ms = Some(5000.0);
    assert_eq!(doc.effective_duration_ms(), 5000.0);
}

#[test]
fn missing_identifiers_are_a_configuration_error() {
    let mut doc = doc();
    doc.template_id = None;
    doc.domain_id = Some("  ".to_owned());
    let err = doc.require_identifiers().unwrap_err();
    assert!(matches!(err, MotionError::Configuration(_)));
    assert_eq!(err.message(), MSG_MISSING_IDENTIFIERS);

    doc.domain_id = Some("d-9".to_owned());
    assert!(doc.require_identifiers().is_ok());
}

#[test]
fn template_without_pages_is_a_configuration_error() {
    let mut doc = doc();
    doc.pages.clear();
    let err = doc.require_identifiers().unwrap_err();
    assert_eq!(err.message(), MSG_NO_TEMPLATE_DATA);
}

#[test]
fn validation_reports_paths() {
    let mut doc = doc();
    doc.pages[0].elements[2].id = ElementId::new("bg");
    doc.pages[0].elements[1].animation.speed = -1.0;
    let err = doc.validate().unwrap_err().to_string();
    assert!(err.contains("$.pages[0].elements[2].id: duplicate element id 'bg'"));
    assert!(err.contains("$.pages[0].elements[1].animation.speed"));
}

#[test]
fn bad_json_is_a_validation_error() {
    let err = TemplateDoc::from_json_str("{ nope").unwrap_err();
    assert!(matches!(err, MotionError::Validation(_)));
}

#[test]
fn unreadable_audio_is_skipped() {
    let doc = doc();
    assert!(doc.load_audio_tracks(Path::new("/nonexistent")).is_empty());
}

#[test]
fn audio_is_decoded_from_video_media_source() {
    if !crate::capture::ffmpeg::is_ffmpeg_on_path() {
        return;
    }
    let dir = std::env::temp_dir().join(format!("motionreel-tpl-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let status = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i", "sine=frequency=440:duration=0.5"])
        .arg(dir.join("clip.wav"))
        .status()
        .unwrap();
    assert!(status.success());

    let tracks = doc().load_audio_tracks(&dir);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].channels, 2);
    assert_eq!(tracks[0].sample_rate, DECODE_SAMPLE_RATE);
    assert!(tracks[0].frames().abs_diff(24_000) < 2_000, "{}", tracks[0].frames());
    let _ = std::fs::remove_dir_all(dir);
}
