use std::fmt;
use std::str::FromStr;

use crate::foundation::core::{Fps, Millis};
use crate::foundation::error::{MotionError, MotionResult};

/// Target file type of an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Webm,
    Mp4,
    Gif,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Gif => "gif",
        }
    }

    /// GIF targets are image sequences and never carry audio.
    pub fn has_audio(self) -> bool {
        !matches!(self, Self::Gif)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webm" => Ok(Self::Webm),
            "mp4" => Ok(Self::Mp4),
            "gif" => Ok(Self::Gif),
            other => Err(MotionError::validation(format!(
                "unsupported export extension '{other}'"
            ))),
        }
    }
}

/// Where a canvas is mounted. Only the exporter holds elements back until they first animate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasMode {
    #[default]
    Editor,
    Exporter,
}

impl CanvasMode {
    pub fn is_exporter(self) -> bool {
        matches!(self, Self::Exporter)
    }
}

pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const DEFAULT_QUALITY: u8 = 100;
pub const DEFAULT_IDEAL_RESOLUTION: u32 = 1200;

/// Settings of one export run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Length of the recording; falls back to the template's own duration when absent.
    pub duration_ms: Option<Millis>,
    pub frame_rate: u32,
    pub format: ExportFormat,
    pub quality: u8,
    /// Pixel length of the longer output side.
    pub ideal_resolution: u32,
    pub name: Option<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            duration_ms: None,
            frame_rate: DEFAULT_FRAME_RATE,
            format: ExportFormat::default(),
            quality: DEFAULT_QUALITY,
            ideal_resolution: DEFAULT_IDEAL_RESOLUTION,
            name: None,
        }
    }
}

impl ExportSettings {
    pub fn validate(&self) -> MotionResult<()> {
        if let Some(d) = self.duration_ms
            && !(d.is_finite() && d > 0.0)
        {
            return Err(MotionError::validation("export duration must be positive"));
        }
        if self.frame_rate == 0 {
            return Err(MotionError::validation("frame rate must be non-zero"));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(MotionError::validation("quality must be in 1..=100"));
        }
        if self.ideal_resolution == 0 {
            return Err(MotionError::validation("ideal resolution must be non-zero"));
        }
        Ok(())
    }

    pub fn fps(&self) -> MotionResult<Fps> {
        Fps::whole(self.frame_rate)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/settings.rs"]
mod tests;
