use crate::foundation::core::{Millis, Rect, Vec2};

/// The visual values an interpolation stream drives for one element (or one token of it).
///
/// `offset_x`/`offset_y` are animation-only displacements on top of the element position and
/// are always zero at rest.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VisualProps {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub opacity: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for VisualProps {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            opacity: 1.0,
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl VisualProps {
    /// Interpolate every field from `a` to `b` with factor `t`.
    pub fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        fn l(a: f64, b: f64, t: f64) -> f64 {
            a + (b - a) * t
        }
        Self {
            x: l(a.x, b.x, t),
            y: l(a.y, b.y, t),
            width: l(a.width, b.width, t),
            height: l(a.height, b.height, t),
            rotation: l(a.rotation, b.rotation, t),
            opacity: l(a.opacity, b.opacity, t),
            scale_x: l(a.scale_x, b.scale_x, t),
            scale_y: l(a.scale_y, b.scale_y, t),
            offset_x: l(a.offset_x, b.offset_x, t),
            offset_y: l(a.offset_y, b.offset_y, t),
        }
    }

    /// Same values with the animation offset cleared.
    pub fn at_rest(mut self) -> Self {
        self.offset_x = 0.0;
        self.offset_y = 0.0;
        self
    }

    /// Displacement applied on top of the element position.
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.offset_x, self.offset_y)
    }

    /// Axis-aligned bounds after offset and scale (scaled about the box centre).
    ///
    /// Rotation is ignored.
    pub fn bounds(&self) -> Rect {
        let w = self.width * self.scale_x;
        let h = self.height * self.scale_y;
        let cx = self.x + self.width / 2.0 + self.offset_x;
        let cy = self.y + self.height / 2.0 + self.offset_y;
        Rect::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }
}

/// Partial update of [`VisualProps`], applied instantaneously by `Interpolator::set`.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PropPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub opacity: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
}

impl PropPatch {
    pub fn opacity(v: f64) -> Self {
        Self {
            opacity: Some(v),
            ..Self::default()
        }
    }

    pub fn offset_y(v: f64) -> Self {
        Self {
            offset_y: Some(v),
            ..Self::default()
        }
    }

    /// Apply the present fields onto `props`.
    pub fn apply(&self, props: &mut VisualProps) {
        let pairs = [
            (self.x, &mut props.x),
            (self.y, &mut props.y),
            (self.width, &mut props.width),
            (self.height, &mut props.height),
            (self.rotation, &mut props.rotation),
            (self.opacity, &mut props.opacity),
            (self.scale_x, &mut props.scale_x),
            (self.scale_y, &mut props.scale_y),
            (self.offset_x, &mut props.offset_x),
            (self.offset_y, &mut props.offset_y),
        ];
        for (src, dst) in pairs {
            if let Some(v) = src {
                *dst = v;
            }
        }
    }
}

impl From<VisualProps> for PropPatch {
    fn from(p: VisualProps) -> Self {
        Self {
            x: Some(p.x),
            y: Some(p.y),
            width: Some(p.width),
            height: Some(p.height),
            rotation: Some(p.rotation),
            opacity: Some(p.opacity),
            scale_x: Some(p.scale_x),
            scale_y: Some(p.scale_y),
            offset_x: Some(p.offset_x),
            offset_y: Some(p.offset_y),
        }
    }
}

/// Which animation preset an element uses. `None` opts the element out of animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationId {
    #[default]
    None,
    Fade,
    Rise,
    Pan,
    Zoom,
    Pop,
}

impl AnimationId {
    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Playback direction of an element animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

/// The set of directions an element is configured to animate in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimateSet {
    #[default]
    Enter,
    Exit,
    Both,
}

impl AnimateSet {
    pub fn includes(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Self::Both, _) | (Self::Enter, Direction::In) | (Self::Exit, Direction::Out)
        )
    }
}

/// Per-element animation configuration as authored in the template.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ElementAnimationConfig {
    pub animation_id: AnimationId,
    pub animate: AnimateSet,
    /// Total motion duration in ms; tokenized elements divide it across tokens.
    pub speed: Millis,
    /// Delay before the first stream starts, in ms.
    pub delay: Millis,
}

impl Default for ElementAnimationConfig {
    fn default() -> Self {
        Self {
            animation_id: AnimationId::None,
            animate: AnimateSet::Enter,
            speed: 1000.0,
            delay: 0.0,
        }
    }
}

/// Sparse overrides layered on top of an [`ElementAnimationConfig`] (preview requests).
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnimationOverrides {
    pub animation_id: Option<AnimationId>,
    pub animate: Option<AnimateSet>,
    pub speed: Option<Millis>,
    pub delay: Option<Millis>,
}

impl AnimationOverrides {
    /// Merge over `base`; keys present here win.
    pub fn merged_over(&self, base: &ElementAnimationConfig) -> ElementAnimationConfig {
        ElementAnimationConfig {
            animation_id: self.animation_id.unwrap_or(base.animation_id),
            animate: self.animate.unwrap_or(base.animate),
            speed: self.speed.unwrap_or(base.speed),
            delay: self.delay.unwrap_or(base.delay),
        }
    }

    /// Whether these overrides name a concrete (non-`None`) animation.
    pub fn names_animation(&self) -> bool {
        self.animation_id.is_some_and(|id| !id.is_none())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/props.rs"]
mod tests;
