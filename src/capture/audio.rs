use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use crate::foundation::core::Millis;
use crate::foundation::error::{MotionError, MotionResult};

/// Decoded audio of one embedded media element.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples in `[-1, 1]`.
    pub samples: Arc<Vec<f32>>,
}

impl AudioTrack {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// The single combined audio track of a recording.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

pub const MIX_CHANNELS: u16 = 2;

/// Sum every track into one stereo track at the highest source sample rate.
///
/// The mix spans exactly `duration_ms`: shorter sources end in silence and longer ones are
/// cut. Returns `None` when there is nothing audible to mix.
pub fn mix_tracks(tracks: &[AudioTrack], duration_ms: Millis) -> Option<MixedAudio> {
    let usable: Vec<&AudioTrack> = tracks
        .iter()
        .filter(|t| t.sample_rate > 0 && t.channels > 0 && t.frames() > 0)
        .collect();
    let sample_rate = usable.iter().map(|t| t.sample_rate).max()?;

    let out_frames = (duration_ms.max(0.0) / 1000.0 * f64::from(sample_rate)).round() as usize;
    let mut out = vec![0.0f32; out_frames * usize::from(MIX_CHANNELS)];
    for track in &usable {
        mix_track(&mut out, sample_rate, track);
    }
    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }

    Some(MixedAudio {
        sample_rate,
        channels: MIX_CHANNELS,
        samples: out,
    })
}

fn mix_track(out: &mut [f32], sample_rate: u32, track: &AudioTrack) {
    let src = track.samples.as_slice();
    let src_frames = track.frames();
    let ch = usize::from(track.channels);
    let ratio = f64::from(track.sample_rate) / f64::from(sample_rate);

    for (dst_frame, dst) in out.chunks_exact_mut(usize::from(MIX_CHANNELS)).enumerate() {
        let src_pos = dst_frame as f64 * ratio;
        let f0 = src_pos.floor() as usize;
        if f0 >= src_frames {
            break;
        }
        let f1 = (f0 + 1).min(src_frames - 1);
        let frac = (src_pos - f0 as f64) as f32;

        let sample = |frame: usize, c: usize| src[frame * ch + c.min(ch - 1)];
        for (c, d) in dst.iter_mut().enumerate() {
            let v0 = sample(f0, c);
            let v1 = sample(f1, c);
            *d += v0 + (v1 - v0) * frac;
        }
    }
}

/// Rate media audio is decoded at before mixing.
pub const DECODE_SAMPLE_RATE: u32 = 48_000;

/// Extract the audio stream of a media file as stereo `f32` PCM with the system `ffmpeg`.
///
/// A file without an audio stream yields an empty track.
pub fn decode_media_audio(path: &Path, sample_rate: u32) -> MotionResult<AudioTrack> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(["-vn", "-f", "f32le", "-acodec", "pcm_f32le", "-ac"])
        .arg(MIX_CHANNELS.to_string())
        .arg("-ar")
        .arg(sample_rate.to_string())
        .arg("pipe:1")
        .output()
        .map_err(|e| MotionError::encode(format!("failed to run ffmpeg for audio decode: {e}")))?;

    let samples = if out.status.success() {
        f32le_samples(&out.stdout)?
    } else {
        let msg = String::from_utf8_lossy(&out.stderr);
        if !is_missing_audio_stream(&msg) {
            return Err(MotionError::encode(format!(
                "ffmpeg audio decode failed for '{}': {}",
                path.display(),
                msg.trim()
            )));
        }
        Vec::new()
    };
    Ok(AudioTrack {
        sample_rate,
        channels: MIX_CHANNELS,
        samples: Arc::new(samples),
    })
}

fn is_missing_audio_stream(stderr: &str) -> bool {
    stderr.contains("matches no streams")
        || stderr.contains("Stream specifier")
        || stderr.contains("does not contain any stream")
}

/// Interpret raw little-endian `f32` bytes as samples.
pub fn f32le_samples(bytes: &[u8]) -> MotionResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(MotionError::encode(
            "decoded audio length is not a whole number of f32 samples",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Write interleaved samples as raw little-endian `f32`.
pub fn write_f32le(samples: &[f32], out_path: &Path) -> MotionResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            MotionError::encode(format!(
                "failed to create audio directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples.len() * 4);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        MotionError::encode(format!(
            "failed to write mixed audio '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/capture/audio.rs"]
mod tests;
