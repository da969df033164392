use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::capture::audio::write_f32le;
use crate::capture::recorder::{ContainerTag, Recorder, RecordingConfig, RecordingState};
use crate::capture::surface::FrameRGBA;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{MotionError, MotionResult};
use crate::foundation::math::{blend_channel, mul_div255_u16};

/// Options for [`FfmpegRecorder`].
#[derive(Clone, Debug)]
pub struct FfmpegRecorderOpts {
    /// Directory for the mixed audio input file.
    pub work_dir: PathBuf,
    /// Background colour used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegRecorderOpts {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

/// Recorder that spawns the system `ffmpeg`, streams raw frames to its stdin and collects the
/// encoded container from its stdout.
pub struct FfmpegRecorder {
    opts: FfmpegRecorderOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_drain: Option<Drain>,
    stderr_drain: Option<Drain>,
    audio_path: Option<PathBuf>,

    scratch: Vec<u8>,
    cfg: Option<RecordingConfig>,
    state: RecordingState,
    last_idx: Option<FrameIndex>,
}

impl FfmpegRecorder {
    pub fn new(opts: FfmpegRecorderOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stdout_drain: None,
            stderr_drain: None,
            audio_path: None,
            scratch: Vec::new(),
            cfg: None,
            state: RecordingState::Idle,
            last_idx: None,
        }
    }

    fn spawn(&mut self, cfg: &RecordingConfig) -> MotionResult<()> {
        if !is_ffmpeg_on_path() {
            return Err(MotionError::capture_not_ready(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            let path = self.opts.work_dir.join("motionreel-mix.f32le");
            write_f32le(&audio.samples, &path)?;
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&path);
            self.audio_path = Some(path);
        } else {
            cmd.arg("-an");
        }
        cmd.args(output_args(&cfg.container, cfg.audio.is_some()));
        cmd.arg("pipe:1");

        let mut child = cmd.spawn().map_err(|e| {
            MotionError::capture_not_ready(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MotionError::encode("failed to open ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MotionError::encode("failed to open ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MotionError::encode("failed to open ffmpeg stderr"))?;

        self.stdout_drain = Some(drain(stdout));
        self.stderr_drain = Some(drain(stderr));
        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }

    fn kill(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        for handle in [self.stdout_drain.take(), self.stderr_drain.take()]
            .into_iter()
            .flatten()
        {
            let _ = handle.join();
        }
    }

    fn remove_audio_file(&mut self) {
        if let Some(path) = self.audio_path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Recorder for FfmpegRecorder {
    fn start(&mut self, cfg: RecordingConfig) -> MotionResult<()> {
        if self.child.is_some() {
            return Err(MotionError::invalid_state("ffmpeg recorder already started"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(MotionError::validation(
                "ffmpeg recorder width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(MotionError::validation(
                "ffmpeg recorder width/height must be even",
            ));
        }

        self.spawn(&cfg)?;
        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            container = %cfg.container,
            audio = cfg.audio.is_some(),
            "ffmpeg recorder started"
        );
        self.scratch = vec![0u8; FrameRGBA::byte_len(cfg.width, cfg.height)];
        self.cfg = Some(cfg);
        self.state = RecordingState::Recording;
        self.last_idx = None;
        Ok(())
    }

    fn capture(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MotionResult<Vec<Vec<u8>>> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| MotionError::invalid_state("ffmpeg recorder not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(MotionError::invalid_state(
                "ffmpeg recorder received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);
        if self.state == RecordingState::Paused {
            return Ok(Vec::new());
        }

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(MotionError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(MotionError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.opts.bg_rgba,
        )?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(MotionError::invalid_state("ffmpeg recorder is already stopped"));
        };
        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            MotionError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        // Encoded output is only collected at stop.
        Ok(Vec::new())
    }

    fn pause(&mut self) {
        if self.state == RecordingState::Recording {
            self.state = RecordingState::Paused;
        }
    }

    fn resume(&mut self) {
        if self.state == RecordingState::Paused {
            self.state = RecordingState::Recording;
        }
    }

    fn stop(&mut self) -> MotionResult<Vec<Vec<u8>>> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| MotionError::invalid_state("ffmpeg recorder not started"))?;
        self.state = RecordingState::Stopped;

        let status = child
            .wait()
            .map_err(|e| MotionError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        let stdout = join_drain(self.stdout_drain.take(), "stdout")?;
        let stderr = join_drain(self.stderr_drain.take(), "stderr")?;
        self.remove_audio_file();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(MotionError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if stdout.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![stdout])
    }

    fn release(&mut self) {
        self.kill();
        self.remove_audio_file();
        self.cfg = None;
        self.scratch = Vec::new();
        self.state = RecordingState::Idle;
        self.last_idx = None;
    }

    fn state(&self) -> RecordingState {
        self.state
    }

    fn container(&self) -> Option<&ContainerTag> {
        self.cfg.as_ref().map(|c| &c.container)
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        self.kill();
        self.remove_audio_file();
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Drain {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join_drain(handle: Option<Drain>, name: &str) -> MotionResult<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| MotionError::encode(format!("ffmpeg {name} drain thread panicked")))?
            .map_err(|e| MotionError::encode(format!("ffmpeg {name} read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // `-r` before `-i` sets the rawvideo input rate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Output codec and muxer arguments for a container tag.
///
/// Output goes to a pipe, so MP4 is written fragmented. h264 inside a webm tag (GIF targets) is
/// muxed as matroska since webm does not allow h264.
pub(crate) fn output_args(container: &ContainerTag, audio: bool) -> Vec<&'static str> {
    let mut args = match (container.media_type(), container.codec()) {
        ("video/mp4", _) => vec![
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "frag_keyframe+empty_moov",
            "-f",
            "mp4",
        ],
        (_, Some("h264")) => vec!["-c:v", "libx264", "-pix_fmt", "yuv420p", "-f", "matroska"],
        _ => vec!["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p", "-f", "webm"],
    };
    if audio {
        let codec = if container.media_type() == "video/mp4" {
            "aac"
        } else {
            "libopus"
        };
        args.extend(["-c:a", codec]);
    }
    args
}

/// Flatten RGBA8 (straight or premultiplied) over an opaque background colour.
pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    premultiplied: bool,
    bg_rgba: [u8; 4],
) -> MotionResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(MotionError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3];
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        for c in 0..3 {
            d[c] = if premultiplied {
                let inv = 255u16 - u16::from(a);
                (u16::from(s[c]) + mul_div255_u16(u16::from(bg_rgba[c]), inv)).min(255) as u8
            } else {
                blend_channel(bg_rgba[c], s[c], a)
            };
        }
        d[3] = 255;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/capture/ffmpeg.rs"]
mod tests;
