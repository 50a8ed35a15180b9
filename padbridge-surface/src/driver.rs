//! Hardware driver for the pad controller over MIDI.
//!
//! Input arrives on midir's callback thread, is decoded into
//! `SurfaceEvent`s and handed to the `SurfaceCallbacks` given at
//! construction. Output writes LED and pad colors as palette indices.

use log::{debug, info, trace, warn};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use padbridge_types::{Button, Color, Encoder, SurfaceEvent, PAD_COLS, PAD_ROWS};

use crate::display::Screen;
use crate::output::OutputSink;

const CLIENT_NAME: &str = "padbridge";

/// Note of the bottom-left pad; pads run up in rows of eight.
const FIRST_PAD_NOTE: u8 = 36;
const LAST_PAD_NOTE: u8 = FIRST_PAD_NOTE + PAD_ROWS * PAD_COLS - 1;

const BUTTON_CCS: [(Button, u8); 34] = [
    (Button::Play, 85),
    (Button::Record, 86),
    (Button::Stop, 29),
    (Button::Metronome, 9),
    (Button::TapTempo, 3),
    (Button::Repeat, 56),
    (Button::Undo, 119),
    (Button::Delete, 118),
    (Button::Shift, 49),
    (Button::Select, 48),
    (Button::Scale, 58),
    (Button::Layout, 31),
    (Button::OctaveUp, 55),
    (Button::OctaveDown, 54),
    (Button::PageLeft, 62),
    (Button::PageRight, 63),
    (Button::Left, 44),
    (Button::Right, 45),
    (Button::Up, 46),
    (Button::Down, 47),
    (Button::Master, 28),
    (Button::Mute, 60),
    (Button::Solo, 61),
    (Button::Automate, 89),
    (Button::AddDevice, 52),
    (Button::AddTrack, 53),
    (Button::Mix, 112),
    (Button::Note, 50),
    (Button::Session, 51),
    (Button::Device, 110),
    (Button::Browse, 111),
    (Button::Clip, 113),
    (Button::Setup, 30),
    (Button::User, 59),
];

const UPPER_ROW_CC: u8 = 102;
const LOWER_ROW_CC: u8 = 20;
const TRACK_ENCODER_CC: u8 = 71;
const TEMPO_ENCODER_CC: u8 = 14;
const SWING_ENCODER_CC: u8 = 15;
const MASTER_ENCODER_CC: u8 = 79;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("MIDI backend unavailable: {0}")]
    Init(#[from] midir::InitError),
    #[error("no MIDI {direction} port matching '{wanted}' (available: {available:?})")]
    PortNotFound {
        direction: &'static str,
        wanted: String,
        available: Vec<String>,
    },
    #[error("could not open MIDI port '{port}': {reason}")]
    Connect { port: String, reason: String },
}

/// Receivers for decoded surface input. Called on the driver's thread.
pub struct SurfaceCallbacks {
    pub on_input: Box<dyn Fn(SurfaceEvent) + Send>,
}

impl SurfaceCallbacks {
    pub fn new(on_input: impl Fn(SurfaceEvent) + Send + 'static) -> Self {
        Self {
            on_input: Box::new(on_input),
        }
    }
}

/// Everything the hardware accepts: color writes plus the display.
pub trait SurfaceOutput: OutputSink {
    fn write_screen(&mut self, screen: &Screen);
    /// Turn every LED and pad off.
    fn clear(&mut self);
}

pub fn button_cc(button: Button) -> u8 {
    match button {
        Button::UpperRow(i) => UPPER_ROW_CC + i,
        Button::LowerRow(i) => LOWER_ROW_CC + i,
        other => BUTTON_CCS
            .iter()
            .find(|(b, _)| *b == other)
            .map(|(_, cc)| *cc)
            .unwrap_or(0),
    }
}

fn cc_button(cc: u8) -> Option<Button> {
    match cc {
        c if (UPPER_ROW_CC..UPPER_ROW_CC + 8).contains(&c) => Some(Button::UpperRow(c - UPPER_ROW_CC)),
        c if (LOWER_ROW_CC..LOWER_ROW_CC + 8).contains(&c) => Some(Button::LowerRow(c - LOWER_ROW_CC)),
        c => BUTTON_CCS.iter().find(|(_, cc)| *cc == c).map(|(b, _)| *b),
    }
}

fn cc_encoder(cc: u8) -> Option<Encoder> {
    match cc {
        c if (TRACK_ENCODER_CC..TRACK_ENCODER_CC + 8).contains(&c) => {
            Some(Encoder::Track(c - TRACK_ENCODER_CC))
        }
        TEMPO_ENCODER_CC => Some(Encoder::Tempo),
        SWING_ENCODER_CC => Some(Encoder::Swing),
        MASTER_ENCODER_CC => Some(Encoder::Master),
        _ => None,
    }
}

/// Two's-complement 7-bit relative encoder value.
fn encoder_delta(value: u8) -> i32 {
    if value < 64 {
        i32::from(value)
    } else {
        i32::from(value) - 128
    }
}

/// Pad position for a pad note; row 0 is the top row.
fn pad_position(note: u8) -> Option<(u8, u8)> {
    if !(FIRST_PAD_NOTE..=LAST_PAD_NOTE).contains(&note) {
        return None;
    }
    let index = note - FIRST_PAD_NOTE;
    Some((PAD_ROWS - 1 - index / PAD_COLS, index % PAD_COLS))
}

pub fn pad_note(row: u8, col: u8) -> u8 {
    FIRST_PAD_NOTE + (PAD_ROWS - 1 - row) * PAD_COLS + col
}

/// Palette index for a named color.
pub fn palette_index(color: Color) -> u8 {
    match color {
        Color::Black => 0,
        Color::Orange => 3,
        Color::Yellow => 8,
        Color::Turquoise => 15,
        Color::Purple => 22,
        Color::Pink => 25,
        Color::White => 122,
        Color::LightGray => 123,
        Color::DarkGray => 124,
        Color::Blue => 125,
        Color::Green => 126,
        Color::Red => 127,
    }
}

/// Decode one raw MIDI message. Touch notes, channel pressure and unknown
/// controls yield `None`.
pub fn parse(data: &[u8]) -> Option<SurfaceEvent> {
    let (&status, rest) = data.split_first()?;
    match (status & 0xF0, rest) {
        (0x90, [note, velocity, ..]) => {
            let (row, col) = pad_position(*note)?;
            if *velocity == 0 {
                Some(SurfaceEvent::PadReleased { row, col })
            } else {
                Some(SurfaceEvent::PadPressed {
                    row,
                    col,
                    velocity: *velocity,
                })
            }
        }
        (0x80, [note, ..]) => {
            let (row, col) = pad_position(*note)?;
            Some(SurfaceEvent::PadReleased { row, col })
        }
        (0xA0, [note, value, ..]) => {
            let (row, col) = pad_position(*note)?;
            Some(SurfaceEvent::PadAftertouch {
                row,
                col,
                value: *value,
            })
        }
        (0xB0, [cc, value, ..]) => {
            if let Some(encoder) = cc_encoder(*cc) {
                return Some(SurfaceEvent::EncoderRotated {
                    encoder,
                    delta: encoder_delta(*value),
                });
            }
            let button = cc_button(*cc)?;
            if *value > 0 {
                Some(SurfaceEvent::ButtonPressed(button))
            } else {
                Some(SurfaceEvent::ButtonReleased(button))
            }
        }
        (0xE0, [lsb, msb, ..]) => {
            Some(SurfaceEvent::Touchstrip((u16::from(*msb) << 7) | u16::from(*lsb)))
        }
        _ => None,
    }
}

/// Pick the port to open among those whose name contains `wanted`. The
/// controller exposes a live port and a user port; `use_user_port`
/// chooses the latter.
fn choose_port(names: &[String], wanted: &str, use_user_port: bool) -> Option<usize> {
    let matching: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.contains(wanted))
        .map(|(i, _)| i)
        .collect();
    let by_label = |label: &str| {
        matching
            .iter()
            .copied()
            .find(|&i| names[i].to_ascii_lowercase().contains(label))
    };
    if use_user_port {
        by_label("user").or_else(|| matching.get(1).copied())
    } else {
        by_label("live").or_else(|| matching.first().copied())
    }
}

/// Live MIDI connection to the controller.
pub struct MidiSurface {
    port_name: String,
    // Closed on drop.
    _input: MidiInputConnection<()>,
    output: MidiOutputConnection,
    last_screen: Option<Screen>,
}

impl MidiSurface {
    pub fn open(
        wanted: &str,
        use_user_port: bool,
        callbacks: SurfaceCallbacks,
    ) -> Result<Self, SurfaceError> {
        let midi_in = MidiInput::new(&format!("{} input", CLIENT_NAME))?;
        let in_ports = midi_in.ports();
        let in_names: Vec<String> = in_ports
            .iter()
            .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
            .collect();
        let in_index =
            choose_port(&in_names, wanted, use_user_port).ok_or_else(|| SurfaceError::PortNotFound {
                direction: "input",
                wanted: wanted.to_string(),
                available: in_names.clone(),
            })?;
        let port_name = in_names[in_index].clone();

        let midi_out = MidiOutput::new(&format!("{} output", CLIENT_NAME))?;
        let out_ports = midi_out.ports();
        let out_names: Vec<String> = out_ports
            .iter()
            .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
            .collect();
        let out_index = choose_port(&out_names, wanted, use_user_port).ok_or_else(|| {
            SurfaceError::PortNotFound {
                direction: "output",
                wanted: wanted.to_string(),
                available: out_names.clone(),
            }
        })?;

        let on_input = callbacks.on_input;
        let input = midi_in
            .connect(
                &in_ports[in_index],
                "padbridge-in",
                move |_timestamp, message, _| match parse(message) {
                    Some(event) => on_input(event),
                    None => trace!(target: "surface", "ignored MIDI {:02X?}", message),
                },
                (),
            )
            .map_err(|e| SurfaceError::Connect {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;

        let output = midi_out
            .connect(&out_ports[out_index], "padbridge-out")
            .map_err(|e| SurfaceError::Connect {
                port: out_names[out_index].clone(),
                reason: e.to_string(),
            })?;

        info!(target: "surface", "connected to {}", port_name);
        Ok(Self {
            port_name,
            _input: input,
            output,
            last_screen: None,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn send(&mut self, message: &[u8]) {
        if let Err(e) = self.output.send(message) {
            warn!(target: "surface", "MIDI send to {} failed: {}", self.port_name, e);
        }
    }
}

impl OutputSink for MidiSurface {
    fn write_button(&mut self, button: Button, color: Color) {
        self.send(&[0xB0, button_cc(button), palette_index(color)]);
    }

    fn write_pad(&mut self, row: u8, col: u8, color: Color) {
        self.send(&[0x90, pad_note(row, col), palette_index(color)]);
    }
}

impl SurfaceOutput for MidiSurface {
    // The display is driven over USB bulk transfers, not MIDI; keep the
    // text in the log instead.
    fn write_screen(&mut self, screen: &Screen) {
        if self.last_screen.as_ref() == Some(screen) {
            return;
        }
        for line in screen.lines() {
            trace!(target: "surface", "| {}", line);
        }
        self.last_screen = Some(screen.clone());
    }

    fn clear(&mut self) {
        for button in Button::all() {
            self.write_button(button, Color::Black);
        }
        for row in 0..PAD_ROWS {
            for col in 0..PAD_COLS {
                self.write_pad(row, col, Color::Black);
            }
        }
        self.last_screen = None;
        debug!(target: "surface", "cleared {}", self.port_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_notes_map_to_grid_positions() {
        match parse(&[0x90, 36, 100]) {
            Some(SurfaceEvent::PadPressed { row, col, velocity }) => {
                assert_eq!((row, col, velocity), (7, 0, 100));
            }
            other => panic!("Expected PadPressed, got {:?}", other),
        }
        assert_eq!(
            parse(&[0x90, 99, 0]),
            Some(SurfaceEvent::PadReleased { row: 0, col: 7 })
        );
        assert_eq!(
            parse(&[0x80, 44, 0]),
            Some(SurfaceEvent::PadReleased { row: 6, col: 0 })
        );
        for (row, col) in [(0, 0), (3, 5), (7, 7)] {
            assert_eq!(pad_position(pad_note(row, col)), Some((row, col)));
        }
    }

    #[test]
    fn touch_notes_are_ignored() {
        assert_eq!(parse(&[0x90, 0, 127]), None);
        assert_eq!(parse(&[0x90, 10, 127]), None);
        assert_eq!(parse(&[0x90, 100, 127]), None);
    }

    #[test]
    fn encoder_values_are_relative() {
        assert_eq!(
            parse(&[0xB0, 71, 1]),
            Some(SurfaceEvent::EncoderRotated {
                encoder: Encoder::Track(0),
                delta: 1
            })
        );
        assert_eq!(
            parse(&[0xB0, 78, 127]),
            Some(SurfaceEvent::EncoderRotated {
                encoder: Encoder::Track(7),
                delta: -1
            })
        );
        assert_eq!(
            parse(&[0xB0, 79, 124]),
            Some(SurfaceEvent::EncoderRotated {
                encoder: Encoder::Master,
                delta: -4
            })
        );
        assert_eq!(
            parse(&[0xB0, 14, 3]),
            Some(SurfaceEvent::EncoderRotated {
                encoder: Encoder::Tempo,
                delta: 3
            })
        );
    }

    #[test]
    fn button_presses_and_releases() {
        assert_eq!(
            parse(&[0xB0, 85, 127]),
            Some(SurfaceEvent::ButtonPressed(Button::Play))
        );
        assert_eq!(
            parse(&[0xB0, 85, 0]),
            Some(SurfaceEvent::ButtonReleased(Button::Play))
        );
        assert_eq!(
            parse(&[0xB0, 104, 127]),
            Some(SurfaceEvent::ButtonPressed(Button::UpperRow(2)))
        );
        assert_eq!(
            parse(&[0xB0, 27, 127]),
            Some(SurfaceEvent::ButtonPressed(Button::LowerRow(7)))
        );
        assert_eq!(parse(&[0xB0, 1, 127]), None);
    }

    #[test]
    fn every_button_has_a_distinct_controller() {
        let mut ccs: Vec<u8> = Button::all().into_iter().map(button_cc).collect();
        assert!(ccs.iter().all(|cc| *cc != 0));
        for button in Button::all() {
            assert_eq!(cc_button(button_cc(button)), Some(button));
        }
        ccs.sort_unstable();
        ccs.dedup();
        assert_eq!(ccs.len(), Button::all().len());
    }

    #[test]
    fn touchstrip_and_aftertouch() {
        assert_eq!(parse(&[0xE0, 0x7F, 0x7F]), Some(SurfaceEvent::Touchstrip(16383)));
        assert_eq!(parse(&[0xE0, 0x00, 0x40]), Some(SurfaceEvent::Touchstrip(8192)));
        assert_eq!(
            parse(&[0xA0, 37, 90]),
            Some(SurfaceEvent::PadAftertouch {
                row: 7,
                col: 1,
                value: 90
            })
        );
        assert_eq!(parse(&[0xD0, 64]), None);
        assert_eq!(parse(&[]), None);
        assert_eq!(parse(&[0x90, 40]), None);
    }

    #[test]
    fn port_choice_prefers_live_or_user() {
        let names = vec![
            "Midi Through".to_string(),
            "Ableton Push 2 Live Port".to_string(),
            "Ableton Push 2 User Port".to_string(),
        ];
        assert_eq!(choose_port(&names, "Ableton Push 2", false), Some(1));
        assert_eq!(choose_port(&names, "Ableton Push 2", true), Some(2));
        assert_eq!(choose_port(&names, "Launchpad", false), None);

        let alsa = vec![
            "Ableton Push 2:Ableton Push 2 MIDI 1 20:0".to_string(),
            "Ableton Push 2:Ableton Push 2 MIDI 2 20:1".to_string(),
        ];
        assert_eq!(choose_port(&alsa, "Ableton Push 2", false), Some(0));
        assert_eq!(choose_port(&alsa, "Ableton Push 2", true), Some(1));
    }

    #[test]
    fn palette_covers_named_colors() {
        assert_eq!(palette_index(Color::Black), 0);
        assert_eq!(palette_index(Color::Red), 127);
        assert_eq!(palette_index(Color::DarkGray), 124);
    }
}
