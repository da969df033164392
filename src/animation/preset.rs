//! Preset table turning an [`AnimationId`] into concrete tween endpoints.

use crate::animation::ease::Ease;
use crate::animation::props::{AnimationId, Direction, VisualProps};
use crate::foundation::core::Millis;

/// Fraction of the element's extent travelled by the `Rise` and `Pan` presets.
const TRAVEL_FRACTION: f64 = 0.5;
const ZOOM_FROM_SCALE: f64 = 0.5;

/// Endpoints and timing for one interpolation stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionTarget {
    pub from: VisualProps,
    pub to: VisualProps,
    pub duration_ms: Millis,
    pub ease: Ease,
}

/// Resolve the tween for `id` played in `direction` around the element's resting props.
///
/// Enter motions end exactly at `defaults`; exit motions start there. Returns `None` for
/// [`AnimationId::None`].
pub fn motion_target(
    id: AnimationId,
    direction: Direction,
    defaults: &VisualProps,
    speed: Millis,
) -> Option<MotionTarget> {
    let rest = defaults.at_rest();
    let (hidden, ease) = match id {
        AnimationId::None => return None,
        AnimationId::Fade => (
            VisualProps {
                opacity: 0.0,
                ..rest
            },
            Ease::Linear,
        ),
        AnimationId::Rise => (
            VisualProps {
                opacity: 0.0,
                offset_y: rest.height * TRAVEL_FRACTION,
                ..rest
            },
            Ease::OutCubic,
        ),
        AnimationId::Pan => (
            VisualProps {
                opacity: 0.0,
                offset_x: -rest.width * TRAVEL_FRACTION,
                ..rest
            },
            Ease::InOutQuad,
        ),
        AnimationId::Zoom => (
            VisualProps {
                opacity: 0.0,
                scale_x: rest.scale_x * ZOOM_FROM_SCALE,
                scale_y: rest.scale_y * ZOOM_FROM_SCALE,
                ..rest
            },
            Ease::OutQuad,
        ),
        AnimationId::Pop => (
            VisualProps {
                scale_x: 0.0,
                scale_y: 0.0,
                ..rest
            },
            Ease::OutBack,
        ),
    };

    let duration_ms = speed.max(0.0);
    Some(match direction {
        Direction::In => MotionTarget {
            from: hidden,
            to: rest,
            duration_ms,
            ease,
        },
        Direction::Out => MotionTarget {
            from: rest,
            to: hidden,
            duration_ms,
            ease,
        },
    })
}

#[cfg(test)]
#[path = "../../tests/unit/animation/preset.rs"]
mod tests;
