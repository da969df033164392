//! Process-wide page sequencing state.
//!
//! [`PageSequencer`] is the single writer. Every mutation is recorded in a [`ChangeSet`]; the
//! stage then publishes one [`SequencingUpdate`] to all element controllers, which only ever
//! read it and decide their own reaction (see [`reaction`]).

pub(crate) mod reaction;

use crate::animation::props::{AnimationOverrides, Direction};
use crate::foundation::core::{ElementId, PageId};

/// Direction of page-level playback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayDirection {
    In,
    Out,
    #[default]
    Idle,
}

impl PlayDirection {
    pub fn as_direction(self) -> Option<Direction> {
        match self {
            Self::In => Some(Direction::In),
            Self::Out => Some(Direction::Out),
            Self::Idle => None,
        }
    }
}

impl From<Direction> for PlayDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::In => Self::In,
            Direction::Out => Self::Out,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewMode {
    /// Every element of the active page, staggered by element index.
    Page,
    /// Only the focused element.
    Element,
}

/// Editor-only trial playback request.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreviewRequest {
    pub mode: PreviewMode,
    /// Element targeted in [`PreviewMode::Element`]; the focused element is used when absent.
    #[serde(default)]
    pub target: Option<ElementId>,
    #[serde(default)]
    pub properties: AnimationOverrides,
}

/// Snapshot of the sequencing state shared by every controller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequencingState {
    pub active_page: Option<PageId>,
    pub is_page_playing: bool,
    pub play_direction: PlayDirection,
    pub force_reset_single: bool,
    pub force_reset_all: bool,
    /// Editor preview mode is switched on.
    pub preview_mode: bool,
    pub preview: Option<PreviewRequest>,
    /// Element currently focused in the editor.
    pub focused_element: Option<ElementId>,
}

/// Which parts of the state changed since the last publish.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub playback: bool,
    pub reset: bool,
    pub active_page: bool,
    pub preview: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !(self.playback || self.reset || self.active_page || self.preview)
    }
}

/// One published revision of the sequencing state.
#[derive(Clone, Debug, PartialEq)]
pub struct SequencingUpdate {
    pub revision: u64,
    pub state: SequencingState,
    pub changes: ChangeSet,
    /// Page that was active before this revision, when `changes.active_page` is set.
    pub previous_page: Option<PageId>,
}

/// Single-writer owner of [`SequencingState`].
#[derive(Debug, Default)]
pub struct PageSequencer {
    state: SequencingState,
    pending: ChangeSet,
    previous_page: Option<PageId>,
    revision: u64,
}

impl PageSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SequencingState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_active_page(&mut self, page: Option<PageId>) {
        if self.state.active_page == page {
            return;
        }
        if !self.pending.active_page {
            self.previous_page = self.state.active_page.clone();
        }
        self.state.active_page = page;
        self.pending.active_page = true;
    }

    /// Start page-level playback in `direction`.
    pub fn play(&mut self, direction: Direction) {
        self.state.is_page_playing = true;
        self.state.play_direction = direction.into();
        self.pending.playback = true;
    }

    /// Stop page-level playback; elements of the active page are reset.
    pub fn stop(&mut self) {
        self.state.is_page_playing = false;
        self.state.play_direction = PlayDirection::Idle;
        self.state.force_reset_single = true;
        self.pending.playback = true;
        self.pending.reset = true;
    }

    /// Reset every element of the active page.
    pub fn reset_current(&mut self) {
        self.state.force_reset_single = true;
        self.pending.reset = true;
    }

    /// Reset every element of every page, cancelling previews and playback.
    pub fn reset_all(&mut self) {
        self.state.force_reset_all = true;
        self.state.is_page_playing = false;
        self.state.play_direction = PlayDirection::Idle;
        self.state.preview = None;
        self.pending.reset = true;
        self.pending.playback = true;
    }

    pub fn set_preview_mode(&mut self, on: bool) {
        if self.state.preview_mode == on {
            return;
        }
        self.state.preview_mode = on;
        if !on {
            self.state.preview = None;
        }
        self.pending.preview = true;
    }

    pub fn focus_element(&mut self, element: Option<ElementId>) {
        self.state.focused_element = element;
    }

    /// Issue a new preview request; supersedes any pending one.
    pub fn request_preview(&mut self, request: PreviewRequest) {
        self.state.preview = Some(request);
        self.pending.preview = true;
    }

    /// Take the accumulated changes as one published revision.
    ///
    /// Reset signals are pulses: they are visible in the returned update and cleared from the
    /// live state afterwards.
    pub fn publish(&mut self) -> Option<SequencingUpdate> {
        if self.pending.is_empty() {
            return None;
        }
        self.revision += 1;
        let update = SequencingUpdate {
            revision: self.revision,
            state: self.state.clone(),
            changes: std::mem::take(&mut self.pending),
            previous_page: self.previous_page.take(),
        };
        self.state.force_reset_single = false;
        self.state.force_reset_all = false;
        Some(update)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequencer/state.rs"]
mod tests;
