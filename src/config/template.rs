use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::animation::props::{ElementAnimationConfig, VisualProps};
use crate::capture::audio::{AudioTrack, DECODE_SAMPLE_RATE, decode_media_audio};
use crate::config::settings::CanvasMode;
use crate::element::controller::{AnimatorSpec, StreamLayout};
use crate::element::tokens::{TypeWriting, token_count};
use crate::foundation::core::{ElementId, Millis, PageId};
use crate::foundation::error::{MotionError, MotionResult};
use crate::stage::{ElementMount, Rgba8};

pub const MSG_MISSING_IDENTIFIERS: &str = "This template is missing domainId or sizeId!";
pub const MSG_NO_TEMPLATE_DATA: &str = "Error when get template data!";

fn default_opacity() -> f64 {
    1.0
}

/// Template as loaded from JSON.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TemplateDoc {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub size_id: Option<String>,
    /// Native width in template units.
    pub width: f64,
    pub height: f64,
    /// Length of the animated composition; derived from element timing when absent.
    #[serde(default)]
    pub duration_ms: Option<Millis>,
    #[serde(default)]
    pub background: Option<Rgba8>,
    #[serde(default)]
    pub pages: Vec<PageDef>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageDef {
    pub id: PageId,
    #[serde(default)]
    pub elements: Vec<ElementDef>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementDef {
    pub id: ElementId,
    #[serde(flatten)]
    pub kind: ElementKind,
    pub frame: ElementFrame,
    #[serde(default)]
    pub animation: ElementAnimationConfig,
    #[serde(default)]
    pub inside_group_box: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Shape {
        fill: Rgba8,
    },
    Text {
        text: String,
        #[serde(default)]
        writing: TypeWriting,
        fill: Rgba8,
    },
    Video {
        fill: Rgba8,
        /// Media file backing the element; its audio stream is mixed into the export.
        /// Relative paths resolve against the template file's directory.
        #[serde(default)]
        src: Option<PathBuf>,
    },
}

impl ElementKind {
    pub fn fill(&self) -> Rgba8 {
        match self {
            Self::Shape { fill } | Self::Text { fill, .. } | Self::Video { fill, .. } => *fill,
        }
    }
}

/// Position and resting appearance of an element.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl ElementFrame {
    pub fn visual_props(&self) -> VisualProps {
        VisualProps {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
            opacity: self.opacity,
            ..VisualProps::default()
        }
    }
}

impl TemplateDoc {
    pub fn from_reader<R: std::io::Read>(r: R) -> MotionResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| MotionError::validation(format!("parse template JSON: {e}")))
    }

    pub fn from_json_str(s: &str) -> MotionResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| MotionError::validation(format!("parse template JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> MotionResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            MotionError::validation(format!("open template JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check that the template can be exported at all.
    pub fn require_identifiers(&self) -> MotionResult<()> {
        if self.pages.is_empty() {
            return Err(MotionError::configuration(MSG_NO_TEMPLATE_DATA));
        }
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !present(&self.template_id) && !present(&self.domain_id) {
            return Err(MotionError::configuration(MSG_MISSING_IDENTIFIERS));
        }
        Ok(())
    }

    /// Structural validation; every problem is reported with its JSON path.
    pub fn validate(&self) -> MotionResult<()> {
        let mut errors = Vec::<String>::new();
        if !(self.width.is_finite() && self.width > 0.0) {
            errors.push("$.width: must be positive".to_owned());
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            errors.push("$.height: must be positive".to_owned());
        }
        if let Some(d) = self.duration_ms
            && !(d.is_finite() && d > 0.0)
        {
            errors.push("$.duration_ms: must be positive".to_owned());
        }

        let mut page_ids = HashSet::new();
        let mut element_ids = HashSet::new();
        for (pi, page) in self.pages.iter().enumerate() {
            if !page_ids.insert(page.id.as_str()) {
                errors.push(format!("$.pages[{pi}].id: duplicate page id '{}'", page.id));
            }
            for (ei, el) in page.elements.iter().enumerate() {
                let at = format!("$.pages[{pi}].elements[{ei}]");
                if !element_ids.insert(el.id.as_str()) {
                    errors.push(format!("{at}.id: duplicate element id '{}'", el.id));
                }
                if !(el.frame.width >= 0.0 && el.frame.height >= 0.0) {
                    errors.push(format!("{at}.frame: size must be non-negative"));
                }
                if !(0.0..=1.0).contains(&el.frame.opacity) {
                    errors.push(format!("{at}.frame.opacity: must be in [0, 1]"));
                }
                if !(el.animation.speed.is_finite() && el.animation.speed >= 0.0) {
                    errors.push(format!("{at}.animation.speed: must be non-negative"));
                }
                if !(el.animation.delay.is_finite() && el.animation.delay >= 0.0) {
                    errors.push(format!("{at}.animation.delay: must be non-negative"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MotionError::validation(format!(
                "template validation failed: {}",
                errors.join("\n")
            )))
        }
    }

    pub fn page(&self, id: &PageId) -> Option<&PageDef> {
        self.pages.iter().find(|p| &p.id == id)
    }

    /// Duration to record: the declared one, else the longest enter animation of the first page.
    pub fn effective_duration_ms(&self) -> Millis {
        if let Some(d) = self.duration_ms {
            return d;
        }
        self.pages
            .first()
            .map(|p| {
                p.elements
                    .iter()
                    .filter(|el| !el.animation.animation_id.is_none())
                    .map(|el| el.animation.delay + el.animation.speed)
                    .fold(0.0, f64::max)
            })
            .unwrap_or(0.0)
    }

    /// Stage mounts for every element of `page`, in paint order.
    pub fn page_mounts(&self, page: &PageDef, mode: CanvasMode) -> Vec<ElementMount> {
        page.elements
            .iter()
            .enumerate()
            .map(|(index, el)| {
                let (layout, stream_count) = match &el.kind {
                    ElementKind::Text { text, writing, .. } if *writing != TypeWriting::Element => {
                        (StreamLayout::Tokenized(*writing), token_count(text, *writing))
                    }
                    _ => (StreamLayout::Grouped, 1),
                };
                ElementMount {
                    animator: AnimatorSpec {
                        id: el.id.clone(),
                        page: page.id.clone(),
                        index,
                        config: el.animation,
                        defaults: el.frame.visual_props(),
                        layout,
                        stream_count,
                        export_mode: mode.is_exporter(),
                    },
                    inside_group_box: el.inside_group_box,
                    fill: el.kind.fill(),
                }
            })
            .collect()
    }

    /// Audio of every video element on every page, decoded from each element's media source.
    ///
    /// Sources that cannot be decoded are skipped with a warning; the export then proceeds
    /// without them.
    pub fn load_audio_tracks(&self, base_dir: &Path) -> Vec<AudioTrack> {
        let mut tracks = Vec::new();
        for el in self.pages.iter().flat_map(|p| p.elements.iter()) {
            let ElementKind::Video { src: Some(src), .. } = &el.kind else {
                continue;
            };
            let path = if src.is_absolute() {
                src.clone()
            } else {
                base_dir.join(src)
            };
            if !path.is_file() {
                tracing::warn!(element = %el.id, path = %path.display(), "audio skipped: media not found");
                continue;
            }
            match decode_media_audio(&path, DECODE_SAMPLE_RATE) {
                Ok(track) if track.frames() == 0 => {
                    tracing::debug!(element = %el.id, "media has no audio stream");
                }
                Ok(track) => {
                    tracing::debug!(element = %el.id, seconds = track.duration_sec(), "audio decoded");
                    tracks.push(track);
                }
                Err(e) => {
                    tracing::warn!(element = %el.id, path = %path.display(), "audio skipped: {e}");
                }
            }
        }
        tracks
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/template.rs"]
mod tests;
