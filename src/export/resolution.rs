use crate::foundation::error::{MotionError, MotionResult};
use crate::foundation::math::round_half_up;

/// Output size derived from a template's native size.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    /// Template units to output pixels.
    pub scale: f64,
}

impl Resolution {
    /// Scale so the longer side matches `ideal`, then bump odd dimensions to the next even one.
    pub fn fit(width: f64, height: f64, ideal: u32) -> MotionResult<Self> {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(MotionError::validation(format!(
                "template size must be positive, got {width}x{height}"
            )));
        }
        if ideal == 0 {
            return Err(MotionError::validation("ideal resolution must be non-zero"));
        }

        let longer = if width > height { width } else { height };
        let scale = f64::from(ideal) / longer;
        Ok(Self {
            width: even(round_half_up(width * scale) as u32),
            height: even(round_half_up(height * scale) as u32),
            scale,
        })
    }
}

fn even(v: u32) -> u32 {
    if v % 2 == 0 { v } else { v + 1 }
}

#[cfg(test)]
#[path = "../../tests/unit/export/resolution.rs"]
mod tests;
