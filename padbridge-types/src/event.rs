use crate::surface::{Button, Encoder, SurfaceEvent};

/// Subscription key for the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ButtonPressed,
    ButtonReleased,
    PadPressed,
    PadReleased,
    PadAftertouch,
    EncoderRotated,
    Touchstrip,
    StateChanged,
    ClipStateChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::ButtonPressed,
        EventKind::ButtonReleased,
        EventKind::PadPressed,
        EventKind::PadReleased,
        EventKind::PadAftertouch,
        EventKind::EncoderRotated,
        EventKind::Touchstrip,
        EventKind::StateChanged,
        EventKind::ClipStateChanged,
    ];
}

/// What part of the DAW mirror a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Track { track: u32 },
    Transport,
    Master,
    Send { track: u32, send: usize },
    Fx { track: u32, fx: usize },
    FxParam { track: u32, fx: usize, param: usize },
    Bank { offset: u32 },
}

/// Coalesced notification that the clip mirror changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipChange {
    /// Set when the whole mirror was refetched.
    pub full_refresh: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ButtonPressed(Button),
    ButtonReleased(Button),
    PadPressed { row: u8, col: u8, velocity: u8 },
    PadReleased { row: u8, col: u8 },
    PadAftertouch { row: u8, col: u8, value: u8 },
    EncoderRotated { encoder: Encoder, delta: i32 },
    Touchstrip(u16),
    StateChanged(StateChange),
    ClipStateChanged(ClipChange),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ButtonPressed(_) => EventKind::ButtonPressed,
            Event::ButtonReleased(_) => EventKind::ButtonReleased,
            Event::PadPressed { .. } => EventKind::PadPressed,
            Event::PadReleased { .. } => EventKind::PadReleased,
            Event::PadAftertouch { .. } => EventKind::PadAftertouch,
            Event::EncoderRotated { .. } => EventKind::EncoderRotated,
            Event::Touchstrip(_) => EventKind::Touchstrip,
            Event::StateChanged(_) => EventKind::StateChanged,
            Event::ClipStateChanged(_) => EventKind::ClipStateChanged,
        }
    }
}

impl From<SurfaceEvent> for Event {
    fn from(event: SurfaceEvent) -> Self {
        match event {
            SurfaceEvent::ButtonPressed(b) => Event::ButtonPressed(b),
            SurfaceEvent::ButtonReleased(b) => Event::ButtonReleased(b),
            SurfaceEvent::PadPressed { row, col, velocity } => {
                Event::PadPressed { row, col, velocity }
            }
            SurfaceEvent::PadReleased { row, col } => Event::PadReleased { row, col },
            SurfaceEvent::PadAftertouch { row, col, value } => {
                Event::PadAftertouch { row, col, value }
            }
            SurfaceEvent::EncoderRotated { encoder, delta } => {
                Event::EncoderRotated { encoder, delta }
            }
            SurfaceEvent::Touchstrip(value) => Event::Touchstrip(value),
        }
    }
}
