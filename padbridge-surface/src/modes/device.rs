use log::info;
use padbridge_types::{Button, Color, Encoder, FxParamUpdate, StateChange, MAX_FX, MAX_FX_PARAMS};

use super::{
    note_pressure, paint_note_grid, play_note, release_note, select_and_arm, shared_encoder,
    transport_footer, Handled, Mode, ModeContext, ModeId,
};
use crate::display::Screen;

const PARAMS_PER_BANK: usize = 8;
const LAST_PARAM_BANK: usize = MAX_FX_PARAMS / PARAMS_PER_BANK - 1;
const LAST_FX: usize = MAX_FX - 1;

/// FX parameter editing on the selected track, eight parameters at a time.
pub struct DeviceMode {
    fx: usize,
    param_bank: usize,
}

impl DeviceMode {
    pub fn new() -> Self {
        Self { fx: 0, param_bank: 0 }
    }

    fn param_index(&self, encoder: usize) -> usize {
        self.param_bank * PARAMS_PER_BANK + encoder
    }

    fn update_buttons(&self, ctx: &mut ModeContext) {
        ctx.surface.row_buttons(
            |i| match i {
                0 | 1 => Color::Blue,
                6 | 7 => Color::Orange,
                _ => Color::DarkGray,
            },
            |_| Color::DarkGray,
        );
    }

    fn moved(&self) {
        info!(
            target: "modes",
            "device: fx {} params {}-{}",
            self.fx + 1,
            self.param_index(0) + 1,
            self.param_index(PARAMS_PER_BANK - 1) + 1
        );
    }
}

impl Default for DeviceMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for DeviceMode {
    fn id(&self) -> ModeId {
        ModeId::Device
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        info!(target: "modes", "entering device mode");
        self.update_buttons(ctx);
        paint_note_grid(ctx);
    }

    fn handle_button(&mut self, ctx: &mut ModeContext, button: Button) -> Handled {
        match button {
            Button::UpperRow(0) => {
                self.param_bank = self.param_bank.saturating_sub(1);
                self.moved();
            }
            Button::UpperRow(1) => {
                self.param_bank = (self.param_bank + 1).min(LAST_PARAM_BANK);
                self.moved();
            }
            Button::UpperRow(6) => {
                self.fx = self.fx.saturating_sub(1);
                self.param_bank = 0;
                self.moved();
            }
            Button::UpperRow(7) => {
                self.fx = (self.fx + 1).min(LAST_FX);
                self.param_bank = 0;
                self.moved();
            }
            Button::UpperRow(_) => {}
            Button::LowerRow(i) => {
                select_and_arm(ctx, i as usize);
                self.fx = 0;
                self.param_bank = 0;
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
        let track = ctx.store.selected_track();
        let param = self.param_index(index);
        let current = ctx
            .store
            .get_fx(track, self.fx)
            .and_then(|fx| fx.params.get(param).map(|p| p.value))
            .unwrap_or(0.0);
        let value = ctx.commands.nudge_fx_param(track, self.fx, param, current, delta);
        ctx.store.update_fx_param(
            track,
            self.fx,
            param,
            FxParamUpdate {
                value: Some(value),
                ..Default::default()
            },
        );
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
        if let StateChange::Bank { .. } = change {
            self.update_buttons(ctx);
        }
    }

    fn render(&self, ctx: &ModeContext) -> Screen {
        let track = ctx.store.selected_track();
        let fx = ctx.store.get_fx(track, self.fx);
        let name = fx
            .as_ref()
            .map_or_else(|| format!("FX {}", self.fx + 1), |fx| fx.name.clone());
        let mut screen = Screen::new(format!("Device: {} (track {})", name, track));
        for i in 0..PARAMS_PER_BANK {
            let param = self.param_index(i);
            let (label, value) = fx
                .as_ref()
                .and_then(|fx| fx.params.get(param))
                .map_or_else(
                    || (format!("Param {}", param + 1), "-".to_string()),
                    |p| (p.name.clone(), format!("{:.0}%", p.value * 100.0)),
                );
            screen.column(i, label, value);
        }
        screen.footer(transport_footer(ctx))
    }
}
