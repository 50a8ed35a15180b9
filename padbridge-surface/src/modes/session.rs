//! Clip launching. Pads are clip slots: column is the track within the
//! current bank, row is the scene within the current scene page.

use log::{debug, info};
use padbridge_types::{Button, ClipChange, Color, Encoder, SlotState, StateChange, PAD_COLS, PAD_ROWS};

use super::{
    nudge_bank_volume, paint_note_grid, shared_encoder, transport_footer, Handled, Mode,
    ModeContext, ModeId,
};
use crate::display::Screen;

const SCENE_PAGE: u32 = PAD_ROWS as u32;

pub struct SessionMode {
    scene_offset: u32,
}

impl SessionMode {
    pub fn new() -> Self {
        Self { scene_offset: 0 }
    }

    /// Clip slot `(column, row)` under a pad.
    fn slot(&self, ctx: &ModeContext, row: u8, col: u8) -> (u32, u32) {
        (ctx.store.bank_offset() + col as u32, self.scene_offset + row as u32)
    }

    fn grid(&self, ctx: &ModeContext) -> Vec<Vec<SlotState>> {
        match ctx.clips {
            Some(clips) => clips.get_grid_state(
                PAD_COLS as u32,
                PAD_ROWS as u32,
                ctx.store.bank_offset(),
                self.scene_offset,
            ),
            None => vec![vec![SlotState::Empty; PAD_COLS as usize]; PAD_ROWS as usize],
        }
    }

    fn repaint(&self, ctx: &mut ModeContext) {
        let grid = self.grid(ctx);
        ctx.surface.paint_pads(|row, col| {
            grid.get(row as usize)
                .and_then(|r| r.get(col as usize))
                .copied()
                .unwrap_or_default()
                .color()
        });
    }

    fn update_buttons(&self, ctx: &mut ModeContext) {
        ctx.surface.row_buttons(
            |i| if i < 2 { Color::Blue } else { Color::DarkGray },
            |_| Color::Red,
        );
    }

    fn scene_down(&mut self, ctx: &ModeContext) {
        let next = self.scene_offset + SCENE_PAGE;
        let rows = ctx.clips.map_or(0, |c| c.num_rows());
        if rows > 0 && next >= rows {
            return;
        }
        self.scene_offset = next;
    }
}

impl Default for SessionMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for SessionMode {
    fn id(&self) -> ModeId {
        ModeId::Session
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        if ctx.clips.is_none() {
            info!(target: "modes", "session mode without clip engine; pads show empty slots");
        }
        self.repaint(ctx);
        self.update_buttons(ctx);
    }

    fn exit(&mut self, ctx: &mut ModeContext) {
        ctx.surface.invalidate_pads();
        paint_note_grid(ctx);
    }

    fn handle_button(&mut self, ctx: &mut ModeContext, button: Button) -> Handled {
        match button {
            Button::UpperRow(0) => {
                self.scene_offset = self.scene_offset.saturating_sub(SCENE_PAGE);
                self.repaint(ctx);
                info!(target: "modes", "scenes from {}", self.scene_offset + 1);
            }
            Button::UpperRow(1) => {
                self.scene_down(ctx);
                self.repaint(ctx);
                info!(target: "modes", "scenes from {}", self.scene_offset + 1);
            }
            Button::UpperRow(_) => {}
            Button::LowerRow(i) => {
                let col = ctx.store.bank_offset() + i as u32;
                if let Some(clips) = ctx.clips {
                    clips.stop_column(col);
                }
                debug!(target: "modes", "stop column {}", col);
            }
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

    fn handle_pad_pressed(&mut self, ctx: &mut ModeContext, row: u8, col: u8, _velocity: u8) {
        let (column, scene) = self.slot(ctx, row, col);
        if let Some(clips) = ctx.clips {
            clips.trigger_slot(column, scene);
        }
        debug!(target: "modes", "trigger slot {}:{}", column, scene);
        ctx.surface.highlight_pad(row, col);
    }

    fn handle_pad_released(&mut self, ctx: &mut ModeContext, row: u8, col: u8) {
        ctx.surface.restore_pad(row, col);
    }

    fn handle_state_change(&mut self, ctx: &mut ModeContext, change: StateChange) {
        if let StateChange::Bank { .. } = change {
            self.repaint(ctx);
        }
    }

    fn handle_clip_change(&mut self, ctx: &mut ModeContext, change: ClipChange) {
        if change.full_refresh {
            debug!(target: "modes", "clip matrix refreshed");
        }
        self.repaint(ctx);
    }

    fn render(&self, ctx: &ModeContext) -> Screen {
        let bank = ctx.store.bank_offset();
        let mut screen = Screen::new(format!(
            "Session: scenes {}-{}",
            self.scene_offset + 1,
            self.scene_offset + SCENE_PAGE
        ));
        let grid = self.grid(ctx);
        for i in 0..PAD_COLS as usize {
            let col = bank + i as u32;
            let name = match ctx.clips {
                Some(clips) => clips.column_name(col),
                None => ctx.store.track_or_default(col + 1).name,
            };
            let playing = grid
                .iter()
                .filter(|row| row.get(i) == Some(&SlotState::Playing))
                .count();
            let value = if playing > 0 { "playing" } else { "" };
            screen.column(i, name, value);
        }
        let footer = match ctx.clips {
            Some(clips) if clips.is_connected() => {
                format!("{}  clips {:.1} BPM", transport_footer(ctx), clips.tempo())
            }
            _ => format!("{}  no clip engine", transport_footer(ctx)),
        };
        screen.footer(footer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Rig, Write};

    #[test]
    fn pads_show_empty_slots_without_clip_engine() {
        let mut rig = Rig::new();
        let mut session = SessionMode::new();
        let mut ctx = rig.ctx();
        session.enter(&mut ctx);
        drop(ctx);
        let writes = rig.output.writes();
        assert!(writes.contains(&Write::Pad(0, 0, Color::DarkGray)));
        assert!(writes.contains(&Write::Button(Button::LowerRow(0), Color::Red)));
    }

    #[test]
    fn scene_page_without_matrix_is_unbounded() {
        let mut rig = Rig::new();
        let mut session = SessionMode::new();
        let mut ctx = rig.ctx();
        session.handle_button(&mut ctx, Button::UpperRow(1));
        session.handle_button(&mut ctx, Button::UpperRow(1));
        assert_eq!(session.scene_offset, 16);
        assert_eq!(session.slot(&ctx, 2, 3), (3, 18));
        session.handle_button(&mut ctx, Button::UpperRow(0));
        assert_eq!(session.render(&ctx).title, "Session: scenes 9-16");
    }

    #[test]
    fn slot_column_follows_track_bank() {
        let mut rig = Rig::new();
        let session = SessionMode::new();
        let ctx = rig.ctx();
        ctx.store.next_bank();
        assert_eq!(session.slot(&ctx, 0, 1), (9, 0));
    }

    #[test]
    fn pad_press_highlights_and_release_restores() {
        let mut rig = Rig::new();
        let mut session = SessionMode::new();
        let mut ctx = rig.ctx();
        session.enter(&mut ctx);
        session.handle_pad_pressed(&mut ctx, 4, 4, 127);
        session.handle_pad_released(&mut ctx, 4, 4);
        drop(ctx);
        let writes = rig.output.writes();
        assert_eq!(
            &writes[writes.len() - 2..],
            &[Write::Pad(4, 4, Color::White), Write::Pad(4, 4, Color::DarkGray)]
        );
    }
}
