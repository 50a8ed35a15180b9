use log::info;
use padbridge_types::{Button, Color, Encoder};

use super::{
    note_pressure, paint_note_grid, play_note, release_note, select_and_arm, shared_encoder,
    transport_footer, Handled, Mode, ModeContext, ModeId,
};
use crate::display::Screen;

/// DAW actions behind the upper-row buttons.
pub const ACTION_FX_BROWSER: i32 = 40271;
pub const ACTION_FX_CHAIN: i32 = 40291;
pub const ACTION_INSERT_INSTRUMENT: i32 = 40346;

const ACTIONS: [(&str, i32); 3] = [
    ("FX Browser", ACTION_FX_BROWSER),
    ("FX Chain", ACTION_FX_CHAIN),
    ("Instrument", ACTION_INSERT_INSTRUMENT),
];

/// Opens the DAW's FX and instrument browsers.
pub struct BrowserMode;

impl BrowserMode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BrowserMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for BrowserMode {
    fn id(&self) -> ModeId {
        ModeId::Browser
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        info!(target: "modes", "entering browser mode");
        ctx.commands.trigger_action(ACTION_FX_BROWSER);
        ctx.surface.row_buttons(
            |i| if i < ACTIONS.len() { Color::Orange } else { Color::DarkGray },
            |_| Color::DarkGray,
        );
        paint_note_grid(ctx);
    }

    fn handle_button(&mut self, ctx: &mut ModeContext, button: Button) -> Handled {
        match button {
            Button::UpperRow(i) => {
                if let Some((name, action)) = ACTIONS.get(i as usize) {
                    ctx.commands.trigger_action(*action);
                    info!(target: "modes", "browser: {}", name);
                }
            }
            Button::LowerRow(i) => select_and_arm(ctx, i as usize),
            _ => return Handled::No,
        }
        Handled::Yes
    }

    fn handle_encoder(&mut self, ctx: &mut ModeContext, encoder: Encoder, delta: i32) {
        if shared_encoder(ctx, encoder, delta) {
            return;
        }
        if encoder == Encoder::Track(0) {
            info!(target: "modes", "browser scroll {:+}", delta);
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

    fn render(&self, ctx: &ModeContext) -> Screen {
        let track = ctx.store.track_or_default(ctx.store.selected_track());
        let mut screen = Screen::new(format!("Browser: {}", track.name));
        for (i, (name, _)) in ACTIONS.iter().enumerate() {
            screen.column(i, *name, "");
        }
        screen.footer(transport_footer(ctx))
    }
}
