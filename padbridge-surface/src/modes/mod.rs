//! Operating modes of the surface.
//!
//! Exactly one mode is active at a time. The dispatcher hands it every
//! input that no global binding claimed, plus state and clip notifications,
//! and asks it for a screen once per frame.

mod browser;
mod device;
mod drum;
mod mixer;
mod scale;
mod session;

pub use browser::BrowserMode;
pub use device::DeviceMode;
pub use drum::DrumMode;
pub use mixer::MixerMode;
pub use scale::ScaleMode;
pub use session::SessionMode;

use log::{debug, info};
use padbridge_core::{CommandClient, DawStateStore};
use padbridge_net::ClipEngineClient;
use padbridge_types::{Button, ClipChange, Encoder, MasterUpdate, StateChange, TrackUpdate};

use crate::display::Screen;
use crate::output::Surface;
use crate::scales::ScaleState;

/// Tempo range reachable from the tempo encoder.
pub const TEMPO_MIN: f32 = 20.0;
pub const TEMPO_MAX: f32 = 300.0;

/// MIDI channel for notes played from the scale grid.
pub const NOTE_CHANNEL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    Mixer,
    Drum,
    Device,
    Session,
    Browser,
    Scale,
}

impl ModeId {
    pub const ALL: [ModeId; 6] = [
        ModeId::Mixer,
        ModeId::Drum,
        ModeId::Device,
        ModeId::Session,
        ModeId::Browser,
        ModeId::Scale,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModeId::Mixer => "mixer",
            ModeId::Drum => "drum",
            ModeId::Device => "device",
            ModeId::Session => "session",
            ModeId::Browser => "browser",
            ModeId::Scale => "scale",
        }
    }
}

/// Whether a mode consumed a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

/// Everything a mode may read or drive while handling one event.
pub struct ModeContext<'a> {
    pub store: &'a DawStateStore,
    pub commands: &'a CommandClient,
    pub clips: Option<&'a ClipEngineClient>,
    pub surface: &'a mut Surface,
    pub scale: &'a mut ScaleState,
}

/// A surface mode. Every capability defaults to doing nothing.
pub trait Mode {
    fn id(&self) -> ModeId;

    /// Called when this mode becomes active
    fn enter(&mut self, _ctx: &mut ModeContext) {}

    /// Called when this mode stops being active
    fn exit(&mut self, _ctx: &mut ModeContext) {}

    fn handle_button(&mut self, _ctx: &mut ModeContext, _button: Button) -> Handled {
        Handled::No
    }

    fn handle_encoder(&mut self, _ctx: &mut ModeContext, _encoder: Encoder, _delta: i32) {}

    fn handle_pad_pressed(&mut self, _ctx: &mut ModeContext, _row: u8, _col: u8, _velocity: u8) {}

    fn handle_pad_released(&mut self, _ctx: &mut ModeContext, _row: u8, _col: u8) {}

    fn handle_aftertouch(&mut self, _ctx: &mut ModeContext, _row: u8, _col: u8, _value: u8) {}

    fn handle_state_change(&mut self, _ctx: &mut ModeContext, _change: StateChange) {}

    fn handle_clip_change(&mut self, _ctx: &mut ModeContext, _change: ClipChange) {}

    fn render(&self, _ctx: &ModeContext) -> Screen {
        Screen::new(self.id().name())
    }
}

/// One instance of every mode, in `ModeId::ALL` order.
pub fn all_modes() -> Vec<Box<dyn Mode>> {
    vec![
        Box::new(MixerMode::new()),
        Box::new(DrumMode::new()),
        Box::new(DeviceMode::new()),
        Box::new(SessionMode::new()),
        Box::new(BrowserMode::new()),
        Box::new(ScaleMode::new()),
    ]
}

// --- Behavior shared between modes ---

/// 1-based track number under bank column `index`.
fn bank_track(ctx: &ModeContext, index: usize) -> u32 {
    ctx.store.bank_offset() + 1 + index as u32
}

/// Master volume and tempo encoders behave the same in every mode.
/// Returns true when `encoder` was one of them.
fn shared_encoder(ctx: &mut ModeContext, encoder: Encoder, delta: i32) -> bool {
    match encoder {
        Encoder::Master => {
            let volume = ctx
                .commands
                .nudge_master_volume(ctx.store.master().volume, delta);
            ctx.store.update_master(MasterUpdate {
                volume: Some(volume),
                ..Default::default()
            });
            true
        }
        Encoder::Tempo => {
            let tempo = (ctx.store.transport().tempo + delta as f32).clamp(TEMPO_MIN, TEMPO_MAX);
            ctx.commands.set_tempo(tempo);
            true
        }
        _ => false,
    }
}

/// Nudge the volume of bank column `index`, if the DAW has reported that
/// track.
fn nudge_bank_volume(ctx: &mut ModeContext, index: usize, delta: i32) {
    let n = bank_track(ctx, index);
    if let Some(track) = ctx.store.get_track(n) {
        let volume = ctx.commands.nudge_track_volume(n, track.volume, delta);
        ctx.store.update_track(n, TrackUpdate::volume(volume));
    }
}

fn select_and_arm(ctx: &mut ModeContext, index: usize) {
    let n = bank_track(ctx, index);
    ctx.commands.select_and_arm_track(n, ctx.store.bank_offset());
    info!(target: "modes", "select and arm track {}", n);
}

/// Repaint the pads as the scale's note grid.
pub(crate) fn paint_note_grid(ctx: &mut ModeContext) {
    let scale = &*ctx.scale;
    ctx.surface.paint_pads(|row, col| scale.pad_color(row, col));
    debug!(
        target: "modes",
        "note grid {} {} (octave {:+})",
        scale.root_name(),
        scale.scale_name(),
        scale.octave_offset()
    );
}

fn play_note(ctx: &mut ModeContext, row: u8, col: u8, velocity: u8) {
    ctx.surface.highlight_pad(row, col);
    if let Some(note) = ctx.scale.midi_note(row, col) {
        ctx.commands.note_on(NOTE_CHANNEL, note, velocity);
        debug!(target: "modes", "pad ({}, {}) vel {} -> note {}", row, col, velocity, note);
    }
}

fn release_note(ctx: &mut ModeContext, row: u8, col: u8) {
    ctx.surface.restore_pad(row, col);
    if let Some(note) = ctx.scale.midi_note(row, col) {
        ctx.commands.note_off(NOTE_CHANNEL, note);
    }
}

fn note_pressure(ctx: &mut ModeContext, row: u8, col: u8, value: u8) {
    if let Some(note) = ctx.scale.midi_note(row, col) {
        ctx.commands.poly_aftertouch(NOTE_CHANNEL, note, value);
    }
}

/// Transport summary shown at the bottom of most screens.
fn transport_footer(ctx: &ModeContext) -> String {
    let transport = ctx.store.transport();
    let bank = ctx.store.bank_offset();
    format!(
        "{} {} BPM  {}  tracks {}-{}",
        if transport.recording {
            "REC"
        } else if transport.playing {
            "PLAY"
        } else {
            "STOP"
        },
        transport.tempo_display,
        transport.beat_display,
        bank + 1,
        bank + padbridge_types::BANK_SIZE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Rig;
    use padbridge_types::TrackUpdate;

    #[test]
    fn modes_are_listed_in_id_order() {
        let ids: Vec<ModeId> = all_modes().iter().map(|m| m.id()).collect();
        assert_eq!(ids, ModeId::ALL.to_vec());
    }

    #[test]
    fn tempo_encoder_is_clamped() {
        let mut rig = Rig::new();
        let mut ctx = rig.ctx();
        assert!(shared_encoder(&mut ctx, Encoder::Tempo, -500));
        assert!(!shared_encoder(&mut ctx, Encoder::Swing, 1));
        drop(ctx);
        assert_eq!(rig.sent_float("/tempo/raw"), Some(TEMPO_MIN));
    }

    #[test]
    fn bank_volume_needs_a_reported_track() {
        let mut rig = Rig::new();
        let mut ctx = rig.ctx();
        nudge_bank_volume(&mut ctx, 0, 1);
        assert!(ctx.store.get_track(1).is_none());

        ctx.store.update_track(1, TrackUpdate::volume(0.5));
        nudge_bank_volume(&mut ctx, 0, 1);
        let volume = ctx.store.track_or_default(1).volume;
        assert!((volume - 0.515).abs() < 1e-6);
    }
}
