/// Progress curves the motion presets pick from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ease {
    Linear,
    OutQuad,
    InOutQuad,
    OutCubic,
    /// Decelerates past the target and settles back onto it.
    OutBack,
}

/// Overshoot constant of `OutBack`; about 10% past the target at its peak.
const BACK_OVERSHOOT: f64 = 1.70158;

impl Ease {
    /// Map linear progress to eased progress. `t` is clamped to `[0, 1]` first.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let inv = 1.0 - t;
        match self {
            Self::Linear => t,
            Self::OutQuad => 1.0 - inv * inv,
            Self::InOutQuad if t < 0.5 => 2.0 * t * t,
            Self::InOutQuad => 1.0 - 2.0 * inv * inv,
            Self::OutCubic => 1.0 - inv.powi(3),
            Self::OutBack => {
                let u = t - 1.0;
                1.0 + (BACK_OVERSHOOT + 1.0) * u.powi(3) + BACK_OVERSHOOT * u * u
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
