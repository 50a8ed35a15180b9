use serde::{Deserialize, Serialize};

use crate::Color;

/// Five-state clip slot model shown on the pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlotState {
    #[default]
    Empty,
    Stopped,
    Playing,
    Recording,
    Queued,
}

impl SlotState {
    pub fn color(self) -> Color {
        match self {
            SlotState::Empty => Color::DarkGray,
            SlotState::Stopped => Color::White,
            SlotState::Playing => Color::Green,
            SlotState::Recording => Color::Red,
            SlotState::Queued => Color::Yellow,
        }
    }
}

/// One (column, row) location in the clip matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipSlot {
    pub column: u32,
    pub row: u32,
    pub state: SlotState,
    pub has_content: bool,
}

impl ClipSlot {
    pub fn new(column: u32, row: u32) -> Self {
        Self {
            column,
            row,
            state: SlotState::Empty,
            has_content: false,
        }
    }

    /// State as displayed: a stopped slot without a clip reads as empty.
    pub fn display_state(&self) -> SlotState {
        if self.state == SlotState::Stopped && !self.has_content {
            SlotState::Empty
        } else {
            self.state
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_without_content_displays_empty() {
        let mut slot = ClipSlot::new(1, 2);
        slot.state = SlotState::Stopped;
        assert_eq!(slot.display_state(), SlotState::Empty);
        slot.has_content = true;
        assert_eq!(slot.display_state(), SlotState::Stopped);
    }

    #[test]
    fn playing_slot_is_shown_even_without_content() {
        let mut slot = ClipSlot::new(0, 0);
        slot.state = SlotState::Playing;
        assert_eq!(slot.display_state(), SlotState::Playing);
    }
}
