//! Write-on-change caches for button LEDs and pad colors.
//!
//! Each cache remembers the last color written per control and skips
//! writes that would not change anything. Code that paints the hardware
//! without going through a cache must call `invalidate` afterwards so the
//! next `set` re-emits.

use std::collections::HashMap;

use log::info;
use padbridge_types::{Button, Color, PAD_COLS, PAD_ROWS};

use crate::display::Screen;
use crate::driver::SurfaceOutput;

/// Raw color writes to the hardware.
pub trait OutputSink {
    fn write_button(&mut self, button: Button, color: Color);
    fn write_pad(&mut self, row: u8, col: u8, color: Color);
}

/// Color shown on a pressed pad.
pub const HIGHLIGHT: Color = Color::White;

const ROWS: usize = PAD_ROWS as usize;
const COLS: usize = PAD_COLS as usize;

#[derive(Debug, Default)]
pub struct ButtonLeds {
    last: HashMap<Button, Color>,
}

impl ButtonLeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a write was issued.
    pub fn set<S: OutputSink + ?Sized>(&mut self, sink: &mut S, button: Button, color: Color) -> bool {
        if self.last.get(&button) == Some(&color) {
            return false;
        }
        sink.write_button(button, color);
        self.last.insert(button, color);
        true
    }

    pub fn get(&self, button: Button) -> Option<Color> {
        self.last.get(&button).copied()
    }

    pub fn invalidate(&mut self) {
        self.last.clear();
    }
}

/// Pad color cache plus the base color each pad returns to after a press.
#[derive(Debug)]
pub struct PadGrid {
    last: [[Option<Color>; COLS]; ROWS],
    base: [[Color; COLS]; ROWS],
}

impl Default for PadGrid {
    fn default() -> Self {
        Self {
            last: [[None; COLS]; ROWS],
            base: [[Color::Black; COLS]; ROWS],
        }
    }
}

impl PadGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a write was issued. Out-of-grid positions are ignored.
    pub fn set<S: OutputSink + ?Sized>(&mut self, sink: &mut S, row: u8, col: u8, color: Color) -> bool {
        let Some(cell) = self
            .last
            .get_mut(row as usize)
            .and_then(|r| r.get_mut(col as usize))
        else {
            return false;
        };
        if *cell == Some(color) {
            return false;
        }
        sink.write_pad(row, col, color);
        *cell = Some(color);
        true
    }

    /// Record `color` as the pad's resting color and show it.
    pub fn set_base<S: OutputSink + ?Sized>(&mut self, sink: &mut S, row: u8, col: u8, color: Color) {
        if let Some(base) = self
            .base
            .get_mut(row as usize)
            .and_then(|r| r.get_mut(col as usize))
        {
            *base = color;
            self.set(sink, row, col, color);
        }
    }

    /// Recompute every resting color from `color_at` and show the result.
    pub fn paint_base<S: OutputSink + ?Sized>(
        &mut self,
        sink: &mut S,
        color_at: impl Fn(u8, u8) -> Color,
    ) {
        for row in 0..PAD_ROWS {
            for col in 0..PAD_COLS {
                self.set_base(sink, row, col, color_at(row, col));
            }
        }
    }

    pub fn base(&self, row: u8, col: u8) -> Option<Color> {
        self.base.get(row as usize)?.get(col as usize).copied()
    }

    pub fn highlight<S: OutputSink + ?Sized>(&mut self, sink: &mut S, row: u8, col: u8) {
        self.set(sink, row, col, HIGHLIGHT);
    }

    pub fn restore<S: OutputSink + ?Sized>(&mut self, sink: &mut S, row: u8, col: u8) {
        if let Some(color) = self.base(row, col) {
            self.set(sink, row, col, color);
        }
    }

    /// Forget what was written; the next `set` per pad always writes.
    pub fn invalidate(&mut self) {
        self.last = [[None; COLS]; ROWS];
    }
}

/// The hardware output plus its caches. Owned by the dispatcher and lent to
/// modes.
pub struct Surface {
    sink: Box<dyn SurfaceOutput>,
    leds: ButtonLeds,
    pads: PadGrid,
}

impl Surface {
    pub fn new(sink: Box<dyn SurfaceOutput>) -> Self {
        Self {
            sink,
            leds: ButtonLeds::new(),
            pads: PadGrid::new(),
        }
    }

    pub fn button(&mut self, button: Button, color: Color) {
        self.leds.set(&mut *self.sink, button, color);
    }

    pub fn button_color(&self, button: Button) -> Option<Color> {
        self.leds.get(button)
    }

    pub fn transport_leds(&mut self, playing: bool, recording: bool) {
        self.button(Button::Play, if playing { Color::Green } else { Color::DarkGray });
        self.button(Button::Record, if recording { Color::Red } else { Color::DarkGray });
    }

    /// Set every upper- and lower-row LED from `upper`/`lower`.
    pub fn row_buttons(&mut self, upper: impl Fn(usize) -> Color, lower: impl Fn(usize) -> Color) {
        for i in 0..8u8 {
            self.button(Button::UpperRow(i), upper(i as usize));
            self.button(Button::LowerRow(i), lower(i as usize));
        }
    }

    pub fn pad_base(&mut self, row: u8, col: u8, color: Color) {
        self.pads.set_base(&mut *self.sink, row, col, color);
    }

    pub fn paint_pads(&mut self, color_at: impl Fn(u8, u8) -> Color) {
        self.pads.paint_base(&mut *self.sink, color_at);
    }

    /// Paint all 64 pads straight to the hardware, then drop the pad cache.
    pub fn paint_pads_direct(&mut self, color_at: impl Fn(u8, u8) -> Color) {
        for row in 0..PAD_ROWS {
            for col in 0..PAD_COLS {
                self.sink.write_pad(row, col, color_at(row, col));
            }
        }
        self.pads.invalidate();
    }

    pub fn highlight_pad(&mut self, row: u8, col: u8) {
        self.pads.highlight(&mut *self.sink, row, col);
    }

    pub fn restore_pad(&mut self, row: u8, col: u8) {
        self.pads.restore(&mut *self.sink, row, col);
    }

    pub fn invalidate_pads(&mut self) {
        self.pads.invalidate();
    }

    pub fn write_screen(&mut self, screen: &Screen) {
        self.sink.write_screen(screen);
    }

    /// Turn every LED and pad off and reset both caches.
    pub fn clear_all(&mut self) {
        self.sink.clear();
        self.leds.invalidate();
        self.pads = PadGrid::new();
        info!(target: "surface", "surface cleared");
    }
}
