use std::io::Cursor;

use image::{Rgba, RgbaImage};

use crate::capture::audio::AudioTrack;
use crate::capture::surface::{CaptureSurface, FrameRGBA, VideoStream};
use crate::foundation::core::{Canvas, Fps, Rect};
use crate::foundation::error::{MotionError, MotionResult};
use crate::foundation::math::blend_channel;
use crate::stage::{ElementVisual, SceneSnapshot};

pub const DEFAULT_POSTER_QUALITY: u8 = 85;

/// CPU surface painting each element as its animated bounding box.
///
/// Template coordinates are multiplied by `scale` to reach output pixels. Tokenized elements
/// are split into equal columns, one per stream. Rotation is not drawn.
#[derive(Clone, Debug)]
pub struct RasterSurface {
    canvas: Canvas,
    scale: f64,
    background: [u8; 4],
    poster_quality: u8,
    audio: Vec<AudioTrack>,
    mounted: bool,
    render_finished: bool,
}

impl RasterSurface {
    pub fn new(canvas: Canvas, scale: f64) -> Self {
        Self {
            canvas,
            scale,
            background: [255, 255, 255, 255],
            poster_quality: DEFAULT_POSTER_QUALITY,
            audio: Vec::new(),
            mounted: false,
            render_finished: false,
        }
    }

    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = rgba;
        self
    }

    pub fn with_audio(mut self, tracks: Vec<AudioTrack>) -> Self {
        self.audio = tracks;
        self
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn mount(&mut self) {
        self.mounted = true;
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
        self.render_finished = false;
    }

    pub fn paint(&self, scene: &SceneSnapshot) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(
            self.canvas.width,
            self.canvas.height,
            Rgba(self.background),
        );
        for element in &scene.elements {
            self.paint_element(&mut img, element);
        }
        img
    }

    fn paint_element(&self, img: &mut RgbaImage, element: &ElementVisual) {
        let n = element.streams.len().max(1) as f64;
        for (i, props) in element.streams.iter().enumerate() {
            let alpha = f64::from(element.fill[3]) * props.opacity.clamp(0.0, 1.0);
            let alpha = alpha.round() as u8;
            if alpha == 0 {
                continue;
            }
            let r = props.bounds();
            let col = r.width() / n;
            let x0 = r.x0 + col * i as f64;
            let token = Rect::new(x0, r.y0, x0 + col, r.y1);
            fill_rect(img, token.scale_from_origin(self.scale), element.fill, alpha);
        }
    }
}

fn fill_rect(img: &mut RgbaImage, rect: Rect, rgba: [u8; 4], alpha: u8) {
    let (w, h) = (f64::from(img.width()), f64::from(img.height()));
    let x0 = rect.x0.round().clamp(0.0, w) as u32;
    let x1 = rect.x1.round().clamp(0.0, w) as u32;
    let y0 = rect.y0.round().clamp(0.0, h) as u32;
    let y1 = rect.y1.round().clamp(0.0, h) as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            let px = img.get_pixel_mut(x, y);
            for c in 0..3 {
                px.0[c] = blend_channel(px.0[c], rgba[c], alpha);
            }
            px.0[3] = px.0[3].max(alpha);
        }
    }
}

impl CaptureSurface for RasterSurface {
    fn open_stream(&mut self, fps: Fps) -> MotionResult<VideoStream> {
        if !self.mounted {
            return Err(MotionError::capture_not_ready("capture surface is not mounted"));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(MotionError::capture_not_ready("capture surface has no size"));
        }
        Ok(VideoStream {
            width: self.canvas.width,
            height: self.canvas.height,
            fps,
        })
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        self.audio.clone()
    }

    fn render(&mut self, scene: &SceneSnapshot) -> MotionResult<FrameRGBA> {
        if !self.mounted {
            return Err(MotionError::capture_not_ready("capture surface is not mounted"));
        }
        let img = self.paint(scene);
        self.render_finished = true;
        Ok(FrameRGBA {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
            premultiplied: false,
        })
    }

    fn poster(&mut self, scene: &SceneSnapshot) -> MotionResult<Vec<u8>> {
        let frame = self.render(scene)?;
        let img = RgbaImage::from_raw(frame.width, frame.height, frame.data)
            .ok_or_else(|| MotionError::encode("poster frame has invalid dimensions"))?;
        let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();

        let mut buffer = Cursor::new(Vec::new());
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, self.poster_quality);
        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| MotionError::encode(format!("poster JPEG encoding failed: {e}")))?;
        Ok(buffer.into_inner())
    }

    fn is_render_finished(&self) -> bool {
        self.render_finished
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/raster.rs"]
mod tests;
