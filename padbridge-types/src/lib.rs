//! # padbridge-types
//!
//! Shared type definitions for the padbridge workspace.
//! Plain data only: DAW entities and their partial updates, clip-engine
//! slots, surface controls and input events, and the bus event enum.

mod clip;
mod color;
pub mod daw;
mod event;
pub mod surface;

pub use clip::{ClipSlot, SlotState};
pub use color::{Color, Rgb};
pub use daw::*;
pub use event::{ClipChange, Event, EventKind, StateChange};
pub use surface::{Button, Encoder, SurfaceEvent};

/// Number of tracks in one bank (one column of encoders/buttons per track).
pub const BANK_SIZE: u32 = 8;

/// Pad grid dimensions.
pub const PAD_ROWS: u8 = 8;
pub const PAD_COLS: u8 = 8;
