use log::info;
use padbridge_types::{Button, Color, Encoder, SendUpdate, StateChange, TrackUpdate};

use super::{
    bank_track, note_pressure, nudge_bank_volume, paint_note_grid, play_note, release_note,
    select_and_arm, shared_encoder, transport_footer, Handled, Mode, ModeContext, ModeId,
};
use crate::display::Screen;

/// What the eight track encoders adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderTarget {
    Volume,
    Pan,
    /// Sends of the selected track, one per encoder.
    Send,
}

impl EncoderTarget {
    fn next(self) -> Self {
        match self {
            EncoderTarget::Volume => EncoderTarget::Pan,
            EncoderTarget::Pan => EncoderTarget::Send,
            EncoderTarget::Send => EncoderTarget::Volume,
        }
    }
}

/// What the lower-row buttons do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LowerRow {
    Select,
    Mute,
    Solo,
}

/// Default mode: volume/pan/send encoders, mute/solo/select row, scale pads.
pub struct MixerMode {
    encoders: EncoderTarget,
    lower_row: LowerRow,
}

impl MixerMode {
    pub fn new() -> Self {
        Self {
            encoders: EncoderTarget::Volume,
            lower_row: LowerRow::Select,
        }
    }

    fn toggle_lower_row(&mut self, ctx: &mut ModeContext, target: LowerRow) {
        self.lower_row = if self.lower_row == target {
            LowerRow::Select
        } else {
            target
        };
        self.update_buttons(ctx);
        info!(target: "modes", "lower row: {:?}", self.lower_row);
    }

    fn update_buttons(&self, ctx: &mut ModeContext) {
        let mode = self.lower_row;
        ctx.surface.button(
            Button::Mute,
            if mode == LowerRow::Mute { Color::Red } else { Color::DarkGray },
        );
        ctx.surface.button(
            Button::Solo,
            if mode == LowerRow::Solo { Color::Yellow } else { Color::DarkGray },
        );

        let tracks = ctx.store.get_bank_tracks();
        ctx.surface.row_buttons(
            |_| Color::DarkGray,
            |i| {
                let track = &tracks[i];
                let lit = match mode {
                    LowerRow::Mute => track.mute.then_some(Color::Red),
                    LowerRow::Solo => track.solo.then_some(Color::Yellow),
                    LowerRow::Select => track.selected.then_some(Color::White),
                };
                lit.unwrap_or(Color::DarkGray)
            },
        );
    }

    fn nudge_send(&self, ctx: &mut ModeContext, send: usize, delta: i32) {
        let track = ctx.store.selected_track();
        if ctx.store.get_track(track).is_none() {
            return;
        }
        let current = ctx.store.get_send(track, send).map_or(0.0, |s| s.volume);
        let volume = ctx.commands.nudge_send_volume(track, send, current, delta);
        ctx.store.update_send(
            track,
            send,
            SendUpdate {
                volume: Some(volume),
                ..Default::default()
            },
        );
    }
}

impl Default for MixerMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for MixerMode {
    fn id(&self) -> ModeId {
        ModeId::Mixer
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        info!(target: "modes", "entering mixer mode");
        self.update_buttons(ctx);
        paint_note_grid(ctx);
    }

    fn handle_button(&mut self, ctx: &mut ModeContext, button: Button) -> Handled {
        match button {
            Button::Mute => self.toggle_lower_row(ctx, LowerRow::Mute),
            Button::Solo => self.toggle_lower_row(ctx, LowerRow::Solo),
            Button::LowerRow(i) => {
                let index = i as usize;
                let n = bank_track(ctx, index);
                match self.lower_row {
                    LowerRow::Mute => ctx.commands.toggle_track_mute(n),
                    LowerRow::Solo => ctx.commands.toggle_track_solo(n),
                    LowerRow::Select => select_and_arm(ctx, index),
                }
            }
            Button::UpperRow(_) => {
                self.encoders = self.encoders.next();
                self.update_buttons(ctx);
                info!(target: "modes", "encoders: {:?}", self.encoders);
            }
            _ => return Handled::No,
        }
        Handled::Yes
    }

    fn handle_encoder(&mut self, ctx: &mut ModeContext, encoder: Encoder, delta: i32) {
        if shared_encoder(ctx, encoder, delta) {
            return;
        }
        let Some(index) = encoder.track_index() else {
            return;
        };
        match self.encoders {
            EncoderTarget::Volume => nudge_bank_volume(ctx, index, delta),
            EncoderTarget::Pan => {
                let n = bank_track(ctx, index);
                if let Some(track) = ctx.store.get_track(n) {
                    let pan = ctx.commands.nudge_track_pan(n, track.pan, delta);
                    ctx.store.update_track(n, TrackUpdate::pan(pan));
                }
            }
            EncoderTarget::Send => self.nudge_send(ctx, index, delta),
        }
    }

    fn handle_pad_pressed(&mut self, ctx: &mut ModeContext, row: u8, col: u8, velocity: u8) {
        play_note(ctx, row, col, velocity);
    }

    fn handle_pad_released(&mut self, ctx: &mut ModeContext, row: u8, col: u8) {
        release_note(ctx, row, col);
    }

    fn handle_aftertouch(&mut self, ctx: &mut ModeContext, row: u8, col: u8, value: u8) {
        note_pressure(ctx, row, col, value);
    }

    fn handle_state_change(&mut self, ctx: &mut ModeContext, change: StateChange) {
        if matches!(change, StateChange::Track { .. } | StateChange::Bank { .. }) {
            self.update_buttons(ctx);
        }
    }

    fn render(&self, ctx: &ModeContext) -> Screen {
        let footer = transport_footer(ctx);
        if self.encoders == EncoderTarget::Send {
            let track = ctx.store.track_or_default(ctx.store.selected_track());
            let mut screen = Screen::new(format!("Sends: {}", track.name));
            for (i, send) in track.sends.iter().take(8).enumerate() {
                screen.column(i, send.name.as_str(), send.volume_display.as_str());
            }
            return screen.footer(footer);
        }

        let title = match self.encoders {
            EncoderTarget::Pan => "Mixer: Pan",
            _ => "Mixer: Volume",
        };
        let mut screen = Screen::new(title);
        for (i, track) in ctx.store.get_bank_tracks().iter().enumerate() {
            let value = if self.encoders == EncoderTarget::Pan {
                &track.pan_display
            } else {
                &track.volume_display
            };
            let name = match (track.mute, track.solo) {
                (true, _) => format!("{} M", track.name),
                (_, true) => format!("{} S", track.name),
                _ => track.name.clone(),
            };
            screen.column(i, name, value.as_str());
        }
        screen.footer(footer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Rig;

    #[test]
    fn mute_button_switches_lower_row_to_mute() {
        let mut rig = Rig::new();
        let mut mixer = MixerMode::new();
        let mut ctx = rig.ctx();
        assert_eq!(mixer.handle_button(&mut ctx, Button::Mute), Handled::Yes);
        assert_eq!(ctx.surface.button_color(Button::Mute), Some(Color::Red));
        mixer.handle_button(&mut ctx, Button::LowerRow(2));
        mixer.handle_button(&mut ctx, Button::Mute);
        assert_eq!(ctx.surface.button_color(Button::Mute), Some(Color::DarkGray));
        drop(ctx);
        assert!(rig.sent_addrs().contains(&"/track/3/mute/toggle".to_string()));
    }

    #[test]
    fn upper_row_cycles_encoder_target() {
        let mut rig = Rig::new();
        let mut mixer = MixerMode::new();
        let mut ctx = rig.ctx();
        ctx.store.update_track(1, TrackUpdate::pan(0.5));
        mixer.handle_button(&mut ctx, Button::UpperRow(0));
        mixer.handle_encoder(&mut ctx, Encoder::Track(0), 2);
        assert!((ctx.store.track_or_default(1).pan - 0.54).abs() < 1e-6);
        assert_eq!(mixer.render(&ctx).title, "Mixer: Pan");

        mixer.handle_button(&mut ctx, Button::UpperRow(0));
        assert!(mixer.render(&ctx).title.starts_with("Sends"));
        mixer.handle_button(&mut ctx, Button::UpperRow(0));
        assert_eq!(mixer.render(&ctx).title, "Mixer: Volume");
    }

    #[test]
    fn send_encoders_follow_selected_track() {
        let mut rig = Rig::new();
        let mut mixer = MixerMode::new();
        let mut ctx = rig.ctx();
        ctx.store.update_track(
            4,
            TrackUpdate {
                selected: Some(true),
                ..Default::default()
            },
        );
        mixer.encoders = EncoderTarget::Send;
        mixer.handle_encoder(&mut ctx, Encoder::Track(1), 10);
        let send = ctx.store.get_send(4, 1).expect("send grown on demand");
        assert!((send.volume - 0.15).abs() < 1e-6);
        drop(ctx);
        assert_eq!(rig.sent_float("/track/4/send/2/volume"), Some(send.volume));
    }

    #[test]
    fn pads_play_scale_notes_with_highlight() {
        let mut rig = Rig::new();
        let mut mixer = MixerMode::new();
        let mut ctx = rig.ctx();
        mixer.enter(&mut ctx);
        mixer.handle_pad_pressed(&mut ctx, 7, 0, 100);
        drop(ctx);
        assert_eq!(rig.output.writes().last(), Some(&crate::testing::Write::Pad(7, 0, Color::White)));
        let mut ctx = rig.ctx();
        mixer.handle_pad_released(&mut ctx, 7, 0);
        drop(ctx);
        assert_eq!(rig.output.writes().last(), Some(&crate::testing::Write::Pad(7, 0, Color::Blue)));
        assert_eq!(rig.sent_int("/vkb_midi/0/note/36"), vec![100, 0]);
    }
}
