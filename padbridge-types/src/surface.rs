//! Physical controls of the surface and the discrete input events it emits.

use serde::{Deserialize, Serialize};

/// A button on the surface. Row buttons carry their 0-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Play,
    Record,
    Stop,
    Metronome,
    TapTempo,
    Repeat,
    Undo,
    Delete,
    Shift,
    Select,
    Scale,
    Layout,
    OctaveUp,
    OctaveDown,
    PageLeft,
    PageRight,
    Left,
    Right,
    Up,
    Down,
    Master,
    Mute,
    Solo,
    Automate,
    AddDevice,
    AddTrack,
    Mix,
    Note,
    Session,
    Device,
    Browse,
    Clip,
    Setup,
    User,
    /// Button above the display, 0..8 left to right.
    UpperRow(u8),
    /// Button below the display, 0..8 left to right.
    LowerRow(u8),
}

impl Button {
    /// Position in the upper row, if this is an upper-row button.
    pub fn upper_row(self) -> Option<usize> {
        match self {
            Button::UpperRow(i) => Some(i as usize),
            _ => None,
        }
    }

    pub fn lower_row(self) -> Option<usize> {
        match self {
            Button::LowerRow(i) => Some(i as usize),
            _ => None,
        }
    }

    /// Every button with an LED, used when clearing the surface.
    pub fn all() -> Vec<Button> {
        let mut buttons = vec![
            Button::Play,
            Button::Record,
            Button::Stop,
            Button::Metronome,
            Button::TapTempo,
            Button::Repeat,
            Button::Undo,
            Button::Delete,
            Button::Shift,
            Button::Select,
            Button::Scale,
            Button::Layout,
            Button::OctaveUp,
            Button::OctaveDown,
            Button::PageLeft,
            Button::PageRight,
            Button::Left,
            Button::Right,
            Button::Up,
            Button::Down,
            Button::Master,
            Button::Mute,
            Button::Solo,
            Button::Automate,
            Button::AddDevice,
            Button::AddTrack,
            Button::Mix,
            Button::Note,
            Button::Session,
            Button::Device,
            Button::Browse,
            Button::Clip,
            Button::Setup,
            Button::User,
        ];
        buttons.extend((0..8).map(Button::UpperRow));
        buttons.extend((0..8).map(Button::LowerRow));
        buttons
    }
}

/// A rotary encoder. Track encoders carry their 0-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoder {
    Track(u8),
    Tempo,
    Swing,
    Master,
}

impl Encoder {
    pub fn track_index(self) -> Option<usize> {
        match self {
            Encoder::Track(i) => Some(i as usize),
            _ => None,
        }
    }
}

/// Discrete input delivered by the hardware driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    ButtonPressed(Button),
    ButtonReleased(Button),
    PadPressed { row: u8, col: u8, velocity: u8 },
    PadReleased { row: u8, col: u8 },
    PadAftertouch { row: u8, col: u8, value: u8 },
    EncoderRotated { encoder: Encoder, delta: i32 },
    /// 14-bit touch strip position, 0..=16383.
    Touchstrip(u16),
}
