//! Scale selection overlay: root on the upper row, scale or layout on the
//! lower row. Any button it does not know hands control back to the mode
//! underneath.

use log::info;
use padbridge_types::{Button, Color};

use super::{paint_note_grid, Handled, Mode, ModeContext, ModeId};
use crate::display::Screen;
use crate::scales::{Layout, ROOT_NAMES, SCALES, TOTAL_PAGES};

/// Lower-row button toggling in-key mode on the settings page.
const IN_KEY_BUTTON: usize = 7;

pub struct ScaleMode;

impl ScaleMode {
    pub fn new() -> Self {
        Self
    }

    fn update_buttons(&self, ctx: &mut ModeContext) {
        let scale = ctx.scale.clone();
        let upper = |i: usize| {
            if i == scale.root() as usize {
                Color::Blue
            } else {
                Color::White
            }
        };
        if scale.is_settings_page() {
            ctx.surface.row_buttons(upper, |i| match Layout::ALL.get(i) {
                Some(layout) if *layout == scale.layout() => Color::Orange,
                Some(_) => Color::White,
                None if i == IN_KEY_BUTTON => {
                    if scale.in_key() {
                        Color::Green
                    } else {
                        Color::DarkGray
                    }
                }
                None => Color::Black,
            });
        } else {
            let first = scale.page() * 8;
            ctx.surface.row_buttons(upper, |i| {
                let index = first + i;
                if index >= SCALES.len() {
                    Color::Black
                } else if index == scale.scale_index() {
                    Color::Turquoise
                } else {
                    Color::White
                }
            });
        }
    }

    fn changed(&self, ctx: &mut ModeContext) {
        paint_note_grid(ctx);
        self.update_buttons(ctx);
    }
}

impl Default for ScaleMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for ScaleMode {
    fn id(&self) -> ModeId {
        ModeId::Scale
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        info!(target: "modes", "scale overlay on");
        ctx.surface.button(Button::Scale, Color::White);
        self.update_buttons(ctx);
    }

    fn exit(&mut self, ctx: &mut ModeContext) {
        info!(
            target: "modes",
            "scale overlay off: {} {}",
            ctx.scale.root_name(),
            ctx.scale.scale_name()
        );
        ctx.surface.button(Button::Scale, Color::DarkGray);
        paint_note_grid(ctx);
    }

    fn handle_button(&mut self, ctx: &mut ModeContext, button: Button) -> Handled {
        match button {
            Button::UpperRow(i) => {
                ctx.scale.set_root(i);
                self.changed(ctx);
                info!(target: "modes", "root {}", ctx.scale.root_name());
            }
            Button::LowerRow(i) => {
                let i = i as usize;
                if ctx.scale.is_settings_page() {
                    if let Some(layout) = Layout::ALL.get(i) {
                        ctx.scale.set_layout(*layout);
                        self.changed(ctx);
                        info!(target: "modes", "layout {}", layout.name());
                    } else if i == IN_KEY_BUTTON {
                        ctx.scale.toggle_in_key();
                        self.changed(ctx);
                        info!(target: "modes", "in key {}", ctx.scale.in_key());
                    }
                } else if ctx.scale.set_scale(ctx.scale.page() * 8 + i) {
                    self.changed(ctx);
                    info!(target: "modes", "scale {}", ctx.scale.scale_name());
                }
            }
            Button::PageLeft => {
                ctx.scale.page_left();
                self.update_buttons(ctx);
            }
            Button::PageRight => {
                ctx.scale.page_right();
                self.update_buttons(ctx);
            }
            _ => return Handled::No,
        }
        Handled::Yes
    }

    fn render(&self, ctx: &ModeContext) -> Screen {
        let scale = &*ctx.scale;
        let mut screen = Screen::new(format!("Scale: {} {}", scale.root_name(), scale.scale_name()));
        for i in 0..8 {
            let lower = if scale.is_settings_page() {
                match Layout::ALL.get(i) {
                    Some(layout) => layout.name().to_string(),
                    None if i == IN_KEY_BUTTON => {
                        let label = if scale.in_key() { "In Key" } else { "Chromatic" };
                        label.to_string()
                    }
                    None => String::new(),
                }
            } else {
                SCALES
                    .get(scale.page() * 8 + i)
                    .map(|s| s.name.to_string())
                    .unwrap_or_default()
            };
            screen.column(i, ROOT_NAMES[i], lower);
        }
        screen.footer(format!(
            "Layout {}  Octave {:+}  Page {}/{}",
            scale.layout().name(),
            scale.octave_offset(),
            scale.page() + 1,
            TOTAL_PAGES
        ))
    }
}
