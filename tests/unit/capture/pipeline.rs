use std::sync::{Arc, Mutex};

use super::*;
use crate::capture::audio::AudioTrack;
use crate::capture::raster::RasterSurface;
use crate::capture::recorder::{MemoryRecorder, RecordingState};
use crate::foundation::core::Canvas;

fn surface() -> RasterSurface {
    let mut s = RasterSurface::new(Canvas { width: 2, height: 2 }, 1.0).with_audio(vec![
        AudioTrack {
            sample_rate: 8,
            channels: 1,
            samples: Arc::new(vec![0.5; 8]),
        },
    ]);
    s.mount();
    s
}

fn fps() -> Fps {
    Fps::whole(10).unwrap()
}

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 2,
        data: vec![v; 16],
        premultiplied: false,
    }
}

/// Records whether the session was opened with audio.
#[derive(Default)]
struct SpyRecorder {
    inner: MemoryRecorder,
    audio: Arc<Mutex<Option<bool>>>,
    released: Arc<Mutex<bool>>,
}

impl Recorder for SpyRecorder {
    fn start(&mut self, cfg: RecordingConfig) -> MotionResult<()> {
        *self.audio.lock().unwrap() = Some(cfg.audio.is_some());
        self.inner.start(cfg)
    }
    fn capture(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MotionResult<Vec<Vec<u8>>> {
        self.inner.capture(idx, frame)
    }
    fn pause(&mut self) {
        self.inner.pause();
    }
    fn resume(&mut self) {
        self.inner.resume();
    }
    fn stop(&mut self) -> MotionResult<Vec<Vec<u8>>> {
        self.inner.stop()
    }
    fn release(&mut self) {
        *self.released.lock().unwrap() = true;
        self.inner.release();
    }
    fn state(&self) -> RecordingState {
        self.inner.state()
    }
    fn container(&self) -> Option<&ContainerTag> {
        self.inner.container()
    }
}

fn recording_pipeline() -> CapturePipeline {
    let mut p = CapturePipeline::new(Box::new(MemoryRecorder::new()));
    p.start(&mut surface(), fps(), ExportFormat::Webm, 1000.0).unwrap();
    p
}

#[test]
fn start_fails_when_surface_is_not_mounted() {
    let mut p = CapturePipeline::new(Box::new(MemoryRecorder::new()));
    let mut s = RasterSurface::new(Canvas { width: 2, height: 2 }, 1.0);
    let err = p.start(&mut s, fps(), ExportFormat::Webm, 1000.0).unwrap_err();
    assert!(matches!(err, MotionError::CaptureNotReady(_)));
    assert_eq!(p.state(), PipelineState::Idle);
}

#[test]
fn chunks_keep_capture_order_and_finalize_concatenates() {
    let mut p = recording_pipeline();
    p.set_poster(vec![0xFF, 0xD8]);
    p.capture(FrameIndex(0), &frame(1)).unwrap();
    p.on_chunk(Vec::new());
    p.capture(FrameIndex(1), &frame(2)).unwrap();
    assert_eq!(p.chunks().len(), 2);
    p.stop().unwrap();

    let asset = p.finalize().unwrap();
    let mut expected = vec![1u8; 16];
    expected.extend(vec![2u8; 16]);
    assert_eq!(asset.video, expected);
    assert_eq!(asset.poster, vec![0xFF, 0xD8]);
    assert_eq!(asset.container.to_string(), "video/webm;codecs=vp9");
    assert_eq!(p.frames_captured(), 2);
}

#[test]
fn finalize_is_valid_only_once() {
    let mut p = recording_pipeline();
    p.set_poster(vec![1]);
    p.stop().unwrap();
    p.finalize().unwrap();
    assert!(matches!(p.finalize(), Err(MotionError::InvalidState(_))));
}

#[test]
fn finalize_requires_a_stopped_session() {
    let mut p = recording_pipeline();
    p.set_poster(vec![1]);
    assert!(matches!(p.finalize(), Err(MotionError::InvalidState(_))));
}

#[test]
fn abort_discards_chunks_and_blocks_finalize() {
    let released = Arc::new(Mutex::new(false));
    let recorder = SpyRecorder {
        released: Arc::clone(&released),
        ..SpyRecorder::default()
    };
    let mut p = CapturePipeline::new(Box::new(recorder));
    p.start(&mut surface(), fps(), ExportFormat::Webm, 1000.0).unwrap();
    p.set_poster(vec![1]);
    p.capture(FrameIndex(0), &frame(1)).unwrap();
    p.abort();

    assert!(p.chunks().is_empty());
    assert_eq!(p.state(), PipelineState::Aborted);
    assert!(*released.lock().unwrap());
    assert!(p.finalize().is_err());
}

#[test]
fn audio_is_mixed_except_for_gif() {
    for (format, expect_audio) in [(ExportFormat::Webm, true), (ExportFormat::Gif, false)] {
        let audio = Arc::new(Mutex::new(None));
        let recorder = SpyRecorder {
            audio: Arc::clone(&audio),
            ..SpyRecorder::default()
        };
        let mut p = CapturePipeline::new(Box::new(recorder));
        p.start(&mut surface(), fps(), format, 1000.0).unwrap();
        assert_eq!(*audio.lock().unwrap(), Some(expect_audio));
    }
}

#[test]
fn missing_poster_blocks_finalize() {
    let mut p = recording_pipeline();
    p.stop().unwrap();
    assert!(matches!(p.finalize(), Err(MotionError::CaptureNotReady(_))));
}
