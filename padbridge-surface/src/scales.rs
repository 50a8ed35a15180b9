//! Musical scales and the virtual note layout of the pad grid.

use log::info;
use padbridge_types::Color;

pub struct Scale {
    pub name: &'static str,
    /// Semitone offsets from the root.
    pub intervals: &'static [u8],
}

pub const SCALES: [Scale; 16] = [
    Scale { name: "Major", intervals: &[0, 2, 4, 5, 7, 9, 11] },
    Scale { name: "Minor", intervals: &[0, 2, 3, 5, 7, 8, 10] },
    Scale { name: "Dorian", intervals: &[0, 2, 3, 5, 7, 9, 10] },
    Scale { name: "Mixolydian", intervals: &[0, 2, 4, 5, 7, 9, 10] },
    Scale { name: "Lydian", intervals: &[0, 2, 4, 6, 7, 9, 11] },
    Scale { name: "Phrygian", intervals: &[0, 1, 3, 5, 7, 8, 10] },
    Scale { name: "Locrian", intervals: &[0, 1, 3, 5, 6, 8, 10] },
    Scale { name: "Harm. Minor", intervals: &[0, 2, 3, 5, 7, 8, 11] },
    Scale { name: "Mel. Minor", intervals: &[0, 2, 3, 5, 7, 9, 11] },
    Scale { name: "Penta. Maj", intervals: &[0, 2, 4, 7, 9] },
    Scale { name: "Penta. Min", intervals: &[0, 3, 5, 7, 10] },
    Scale { name: "Blues", intervals: &[0, 3, 5, 6, 7, 10] },
    Scale { name: "Whole Tone", intervals: &[0, 2, 4, 6, 8, 10] },
    Scale { name: "Diminished", intervals: &[0, 2, 3, 5, 6, 8, 9, 11] },
    Scale { name: "Hungarian Min", intervals: &[0, 2, 3, 6, 7, 8, 11] },
    Scale { name: "Spanish", intervals: &[0, 1, 4, 5, 7, 9, 10] },
];

pub const ROOT_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pages of eight scales, followed by one settings page.
pub const SCALE_PAGES: usize = SCALES.len().div_ceil(8);
pub const TOTAL_PAGES: usize = SCALE_PAGES + 1;

/// Note of the bottom-left pad with root C and no octave shift.
const START_NOTE: i32 = 36;

/// Row interval of the virtual note grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Fourth,
    Third,
    Sequent,
}

impl Layout {
    pub const ALL: [Layout; 3] = [Layout::Fourth, Layout::Third, Layout::Sequent];

    /// Semitones between vertically adjacent pads.
    pub fn interval(self) -> i32 {
        match self {
            Layout::Fourth => 5,
            Layout::Third => 4,
            Layout::Sequent => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Layout::Fourth => "4th",
            Layout::Third => "3rd",
            Layout::Sequent => "Sequent",
        }
    }
}

/// Current scale selection, shared by the note-playing modes and the
/// scale overlay.
#[derive(Debug, Clone, Default)]
pub struct ScaleState {
    root: u8,
    scale: usize,
    layout: Layout,
    octave: i32,
    page: usize,
    in_key: bool,
}

impl ScaleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn root_name(&self) -> &'static str {
        ROOT_NAMES[self.root as usize]
    }

    pub fn set_root(&mut self, root: u8) {
        self.root = root % 12;
    }

    pub fn scale_index(&self) -> usize {
        self.scale
    }

    pub fn scale(&self) -> &'static Scale {
        &SCALES[self.scale]
    }

    pub fn scale_name(&self) -> &'static str {
        self.scale().name
    }

    /// Select scale `index`; returns false if there is no such scale.
    pub fn set_scale(&mut self, index: usize) -> bool {
        if index < SCALES.len() {
            self.scale = index;
            true
        } else {
            false
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    pub fn octave_offset(&self) -> i32 {
        self.octave
    }

    pub fn in_key(&self) -> bool {
        self.in_key
    }

    pub fn toggle_in_key(&mut self) {
        self.in_key = !self.in_key;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn is_settings_page(&self) -> bool {
        self.page >= SCALE_PAGES
    }

    pub fn page_left(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    pub fn page_right(&mut self) {
        self.page = (self.page + 1).min(TOTAL_PAGES - 1);
    }

    /// Virtual note of the bottom-left pad.
    pub fn base_note(&self) -> i32 {
        START_NOTE + self.root as i32 + self.octave * 12
    }

    /// Shift the grid up an octave. Returns false at the top of the range.
    pub fn octave_up(&mut self) -> bool {
        if self.base_note() + 12 > 108 {
            return false;
        }
        self.octave += 1;
        info!(target: "modes", "octave up, base note {}", self.base_note());
        true
    }

    pub fn octave_down(&mut self) -> bool {
        if self.base_note() - 12 < 0 {
            return false;
        }
        self.octave -= 1;
        info!(target: "modes", "octave down, base note {}", self.base_note());
        true
    }

    /// Virtual note for a pad; row 0 is the top row. May fall outside the
    /// MIDI range at the extremes.
    pub fn pad_note(&self, row: u8, col: u8) -> i32 {
        self.base_note() + (7 - row as i32) * self.layout.interval() + col as i32
    }

    /// `pad_note` when it is a playable MIDI note.
    pub fn midi_note(&self, row: u8, col: u8) -> Option<u8> {
        u8::try_from(self.pad_note(row, col)).ok().filter(|n| *n <= 127)
    }

    pub fn in_scale(&self, note: i32) -> bool {
        let semitone = (note - self.root as i32).rem_euclid(12);
        self.scale().intervals.contains(&(semitone as u8))
    }

    pub fn note_color(&self, note: i32) -> Color {
        if note.rem_euclid(12) == self.root as i32 {
            Color::Blue
        } else if self.in_scale(note) {
            Color::Turquoise
        } else if self.in_key {
            Color::Black
        } else {
            Color::DarkGray
        }
    }

    /// Resting color of a pad in the note grid.
    pub fn pad_color(&self, row: u8, col: u8) -> Color {
        self.note_color(self.pad_note(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_left_pad_is_base_note() {
        let mut scale = ScaleState::new();
        assert_eq!(scale.pad_note(7, 0), 36);
        assert_eq!(scale.pad_note(6, 0), 41);
        assert_eq!(scale.pad_note(7, 3), 39);
        scale.set_layout(Layout::Sequent);
        assert_eq!(scale.pad_note(6, 0), 37);
        scale.set_root(2);
        assert_eq!(scale.base_note(), 38);
    }

    #[test]
    fn octave_shift_is_bounded() {
        let mut scale = ScaleState::new();
        let mut ups = 0;
        while scale.octave_up() {
            ups += 1;
        }
        assert_eq!(ups, 6);
        assert_eq!(scale.base_note(), 108);
        while scale.octave_down() {}
        assert_eq!(scale.base_note(), 0);
        assert!(!scale.octave_down());
    }

    #[test]
    fn high_pads_leave_the_midi_range() {
        let mut scale = ScaleState::new();
        while scale.octave_up() {}
        assert_eq!(scale.midi_note(7, 0), Some(108));
        assert_eq!(scale.midi_note(0, 7), None);
    }

    #[test]
    fn colors_follow_scale_membership() {
        let mut scale = ScaleState::new();
        scale.set_root(9);
        scale.set_scale(1);
        assert_eq!(scale.note_color(57), Color::Blue);
        assert_eq!(scale.note_color(60), Color::Turquoise);
        assert_eq!(scale.note_color(61), Color::DarkGray);
        scale.toggle_in_key();
        assert_eq!(scale.note_color(61), Color::Black);
    }

    #[test]
    fn pages_stop_at_the_settings_page() {
        let mut scale = ScaleState::new();
        scale.page_left();
        assert_eq!(scale.page(), 0);
        for _ in 0..5 {
            scale.page_right();
        }
        assert_eq!(scale.page(), TOTAL_PAGES - 1);
        assert!(scale.is_settings_page());
        assert!(!scale.set_scale(SCALES.len()));
        assert_eq!(scale.scale_name(), "Major");
    }
}
