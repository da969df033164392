use crate::capture::audio::AudioTrack;
use crate::foundation::core::Fps;
use crate::foundation::error::MotionResult;
use crate::stage::SceneSnapshot;

/// One captured frame as RGBA8 bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major.
    pub data: Vec<u8>,
    /// Colour channels are premultiplied by alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }
}

/// Live video stream obtained from a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoStream {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

/// Visual output the capture pipeline records from.
pub trait CaptureSurface {
    /// Obtain a live video stream. Fails with `CaptureNotReady` while the surface is not mounted.
    fn open_stream(&mut self, fps: Fps) -> MotionResult<VideoStream>;
    /// Audio of every embedded media element, in page order.
    fn audio_tracks(&self) -> Vec<AudioTrack>;
    /// Draw the scene and return the resulting frame.
    fn render(&mut self, scene: &SceneSnapshot) -> MotionResult<FrameRGBA>;
    /// Draw the scene as a JPEG poster image.
    fn poster(&mut self, scene: &SceneSnapshot) -> MotionResult<Vec<u8>>;
    /// The first full render of the template has completed.
    fn is_render_finished(&self) -> bool;
}
