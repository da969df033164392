use crate::animation::props::{Direction, ElementAnimationConfig};
use crate::foundation::core::{ElementId, Millis, PageId};
use crate::sequencer::{PreviewMode, SequencingUpdate};

/// Extra start delay per element index when a whole page is previewed.
pub const PAGE_PREVIEW_STAGGER_MS: Millis = 200.0;

/// What one element sees of itself when deciding how to react.
#[derive(Clone, Copy, Debug)]
pub struct ElementView<'a> {
    pub id: &'a ElementId,
    pub page: &'a PageId,
    pub index: usize,
    pub config: &'a ElementAnimationConfig,
    pub inside_group_box: bool,
}

/// Outcome of evaluating one [`SequencingUpdate`] for one element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reaction {
    /// Leave the element untouched.
    Keep,
    Reset,
    /// Play the element's own configuration in this direction.
    Play(Direction),
    /// Schedule a debounced preview play-in.
    Preview {
        config: ElementAnimationConfig,
        delay: Millis,
    },
}

/// Decide how `element` reacts to `update`.
///
/// Rules are evaluated in priority order: reset, page playback, preview. The first rule that
/// applies wins, so a reset in the same revision as a play request always prevails.
pub fn decide(update: &SequencingUpdate, element: &ElementView<'_>) -> Reaction {
    let state = &update.state;
    let changes = update.changes;
    let on_active_page = state.active_page.as_ref() == Some(element.page);

    if state.force_reset_all {
        return Reaction::Reset;
    }
    if on_active_page
        && (changes.reset || changes.playback || changes.active_page)
        && (state.force_reset_single || !state.is_page_playing)
    {
        return Reaction::Reset;
    }
    if changes.active_page && !on_active_page && update.previous_page.as_ref() == Some(element.page)
    {
        return Reaction::Reset;
    }

    if on_active_page && state.is_page_playing && changes.playback {
        let Some(direction) = state.play_direction.as_direction() else {
            return Reaction::Keep;
        };
        let config = element.config;
        if config.animation_id.is_none() || !config.animate.includes(direction) {
            return Reaction::Keep;
        }
        return Reaction::Play(direction);
    }

    if changes.preview
        && state.preview_mode
        && !state.is_page_playing
        && on_active_page
        && !element.inside_group_box
        && let Some(request) = &state.preview
        && request.properties.names_animation()
    {
        let merged = request.properties.merged_over(element.config);
        return match request.mode {
            PreviewMode::Page => Reaction::Preview {
                config: merged,
                delay: element.index as f64 * PAGE_PREVIEW_STAGGER_MS,
            },
            PreviewMode::Element => {
                let target = request.target.as_ref().or(state.focused_element.as_ref());
                if target == Some(element.id) {
                    Reaction::Preview {
                        config: merged,
                        delay: 0.0,
                    }
                } else {
                    Reaction::Keep
                }
            }
        };
    }

    Reaction::Keep
}

#[cfg(test)]
#[path = "../../tests/unit/sequencer/reaction.rs"]
mod tests;
