//! Drum pads plus a 16-step grid per pad.
//!
//! The bottom-left 4x4 block plays drum notes; the top two rows show and
//! toggle the steps of the last pad played. This mode repaints the whole
//! grid on every change, so it writes past the pad cache and drops it.

use std::collections::HashMap;

use log::{debug, info};
use padbridge_types::{Button, Color, Encoder};

use super::{
    nudge_bank_volume, paint_note_grid, select_and_arm, shared_encoder, transport_footer, Handled,
    Mode, ModeContext, ModeId,
};
use crate::display::Screen;

/// General MIDI drum channel (10, zero-based).
pub const DRUM_CHANNEL: u8 = 9;
const STEPS: usize = 16;
const PADS: usize = 16;
const FIRST_BANK: u8 = 36;
const LAST_BANK: u8 = 112;

pub struct DrumMode {
    /// Note of drum pad 0.
    bank: u8,
    selected: usize,
    steps: [[bool; STEPS]; PADS],
    held: HashMap<(u8, u8), u8>,
}

/// Drum pad index for a pad in the bottom-left 4x4 block.
fn drum_pad(row: u8, col: u8) -> Option<usize> {
    if (4..=7).contains(&row) && col <= 3 {
        Some(((7 - row) * 4 + col) as usize)
    } else {
        None
    }
}

/// Step index for a pad in the top two rows.
fn step(row: u8, col: u8) -> Option<usize> {
    if row <= 1 && col <= 7 {
        Some(((1 - row) * 8 + col) as usize)
    } else {
        None
    }
}

impl DrumMode {
    pub fn new() -> Self {
        Self {
            bank: FIRST_BANK,
            selected: 0,
            steps: [[false; STEPS]; PADS],
            held: HashMap::new(),
        }
    }

    fn pad_color(&self, row: u8, col: u8) -> Color {
        if let Some(pad) = drum_pad(row, col) {
            if pad == self.selected {
                Color::Orange
            } else {
                Color::Yellow
            }
        } else if let Some(step) = step(row, col) {
            if self.steps[self.selected][step] {
                Color::Green
            } else {
                Color::DarkGray
            }
        } else {
            Color::Black
        }
    }

    fn repaint(&self, ctx: &mut ModeContext) {
        ctx.surface.paint_pads_direct(|row, col| self.pad_color(row, col));
    }

    fn update_buttons(&self, ctx: &mut ModeContext) {
        ctx.surface.row_buttons(
            |i| if i < 2 { Color::Blue } else { Color::DarkGray },
            |_| Color::DarkGray,
        );
    }
}

impl Default for DrumMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for DrumMode {
    fn id(&self) -> ModeId {
        ModeId::Drum
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        info!(target: "modes", "entering drum mode (notes {}-{})", self.bank, self.bank + 15);
        self.repaint(ctx);
        self.update_buttons(ctx);
    }

    fn exit(&mut self, ctx: &mut ModeContext) {
        ctx.surface.invalidate_pads();
        paint_note_grid(ctx);
    }

    fn handle_button(&mut self, ctx: &mut ModeContext, button: Button) -> Handled {
        match button {
            Button::LowerRow(i) => select_and_arm(ctx, i as usize),
            Button::UpperRow(0) => {
                self.bank = self.bank.saturating_sub(16);
                self.repaint(ctx);
                info!(target: "modes", "drum bank {}-{}", self.bank, self.bank + 15);
            }
            Button::UpperRow(1) => {
                self.bank = (self.bank + 16).min(LAST_BANK);
                self.repaint(ctx);
                info!(target: "modes", "drum bank {}-{}", self.bank, self.bank + 15);
            }
            Button::UpperRow(_) => {}
            _ => return Handled::No,
        }
        Handled::Yes
    }

    fn handle_encoder(&mut self, ctx: &mut ModeContext, encoder: Encoder, delta: i32) {
        if shared_encoder(ctx, encoder, delta) {
            return;
        }
        if let Some(index) = encoder.track_index() {
            nudge_bank_volume(ctx, index, delta);
        }
    }

    fn handle_pad_pressed(&mut self, ctx: &mut ModeContext, row: u8, col: u8, velocity: u8) {
        if let Some(pad) = drum_pad(row, col) {
            let note = self.bank + pad as u8;
            self.selected = pad;
            self.held.insert((row, col), note);
            ctx.commands.note_on(DRUM_CHANNEL, note, velocity);
            debug!(target: "modes", "drum pad {} vel {} -> note {}", pad, velocity, note);
            self.repaint(ctx);
            ctx.surface.highlight_pad(row, col);
        } else if let Some(step) = step(row, col) {
            let cell = &mut self.steps[self.selected][step];
            *cell = !*cell;
            debug!(target: "modes", "pad {} step {} -> {}", self.selected, step, *cell);
            self.repaint(ctx);
        }
    }

    fn handle_pad_released(&mut self, ctx: &mut ModeContext, row: u8, col: u8) {
        if drum_pad(row, col).is_none() {
            return;
        }
        if let Some(note) = self.held.remove(&(row, col)) {
            ctx.commands.note_off(DRUM_CHANNEL, note);
        }
        self.repaint(ctx);
    }

    fn handle_aftertouch(&mut self, ctx: &mut ModeContext, row: u8, col: u8, value: u8) {
        if let Some(note) = self.held.get(&(row, col)) {
            ctx.commands.poly_aftertouch(DRUM_CHANNEL, *note, value);
        }
    }

    fn render(&self, ctx: &ModeContext) -> Screen {
        let mut screen = Screen::new(format!("Drums: pad {}", self.selected + 1));
        screen.column(0, "Bank", format!("{}-{}", self.bank, self.bank + 15));
        screen.column(1, "Pad", (self.selected + 1).to_string());
        screen.column(2, "Note", (self.bank as usize + self.selected).to_string());
        let pattern: String = self.steps[self.selected]
            .iter()
            .map(|on| if *on { 'x' } else { '.' })
            .collect();
        screen.column(3, "Steps", pattern);
        screen.footer(transport_footer(ctx))
    }
}
