//! DAW-side entities mirrored from the feedback protocol.

use serde::{Deserialize, Serialize};

use crate::Rgb;

/// Highest track number the mirror will materialize (tracks are 1-based).
pub const MAX_TRACKS: u32 = 64;
/// Sends kept per track.
pub const MAX_SENDS: usize = 16;
/// FX slots kept per track.
pub const MAX_FX: usize = 32;
/// Parameters kept per FX.
pub const MAX_FX_PARAMS: usize = 128;

/// Default fader position, roughly 0 dB on REAPER's volume curve.
pub const DEFAULT_VOLUME: f32 = 0.716;

/// Track automation mode, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutomationMode {
    #[default]
    Trim,
    Read,
    Touch,
    Write,
    Latch,
}

impl AutomationMode {
    pub const ALL: [AutomationMode; 5] = [
        AutomationMode::Trim,
        AutomationMode::Read,
        AutomationMode::Touch,
        AutomationMode::Write,
        AutomationMode::Latch,
    ];

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// The mode after this one, wrapping from Latch back to Trim.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() as usize + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            AutomationMode::Trim => "Trim",
            AutomationMode::Read => "Read",
            AutomationMode::Touch => "Touch",
            AutomationMode::Write => "Write",
            AutomationMode::Latch => "Latch",
        }
    }
}

/// One send slot on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSend {
    pub name: String,
    pub volume: f32,
    pub volume_display: String,
    pub pan: f32,
}

impl TrackSend {
    /// Default send at a 0-based index.
    pub fn new(index: usize) -> Self {
        Self {
            name: format!("Send {}", index + 1),
            volume: 0.0,
            volume_display: "-inf dB".to_string(),
            pan: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// 1-based track number, stable for the session.
    pub index: u32,
    pub name: String,
    pub volume: f32,
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,
    pub rec_arm: bool,
    pub selected: bool,
    pub vu: f32,
    pub vu_l: f32,
    pub vu_r: f32,
    pub volume_display: String,
    pub pan_display: String,
    pub color: Option<Rgb>,
    pub automation_mode: AutomationMode,
    pub sends: Vec<TrackSend>,
}

impl Track {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            name: format!("Track {}", index),
            volume: DEFAULT_VOLUME,
            pan: 0.5,
            mute: false,
            solo: false,
            rec_arm: false,
            selected: false,
            vu: 0.0,
            vu_l: 0.0,
            vu_r: 0.0,
            volume_display: "0.0 dB".to_string(),
            pan_display: "<C>".to_string(),
            color: None,
            automation_mode: AutomationMode::Trim,
            sends: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxParam {
    pub name: String,
    pub value: f32,
}

impl FxParam {
    pub fn new(index: usize) -> Self {
        Self {
            name: format!("Param {}", index + 1),
            value: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fx {
    pub name: String,
    pub params: Vec<FxParam>,
}

impl Fx {
    pub fn new(index: usize) -> Self {
        Self {
            name: format!("FX {}", index + 1),
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    pub playing: bool,
    pub recording: bool,
    pub paused: bool,
    pub repeat: bool,
    pub tempo: f32,
    pub tempo_display: String,
    pub beat_display: String,
    pub time_display: String,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            playing: false,
            recording: false,
            paused: false,
            repeat: false,
            tempo: 120.0,
            tempo_display: "120.00".to_string(),
            beat_display: "1.1.00".to_string(),
            time_display: "0:00.000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Master {
    pub volume: f32,
    pub pan: f32,
    pub vu: f32,
    pub volume_display: String,
}

impl Default for Master {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            pan: 0.5,
            vu: 0.0,
            volume_display: "0.0 dB".to_string(),
        }
    }
}

// Partial updates: only `Some` fields are applied.

macro_rules! apply_some {
    ($update:ident => $target:ident; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $update.$field {
                $target.$field = value;
            }
        )+
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackUpdate {
    pub name: Option<String>,
    pub volume: Option<f32>,
    pub pan: Option<f32>,
    pub mute: Option<bool>,
    pub solo: Option<bool>,
    pub rec_arm: Option<bool>,
    pub selected: Option<bool>,
    pub vu: Option<f32>,
    pub vu_l: Option<f32>,
    pub vu_r: Option<f32>,
    pub volume_display: Option<String>,
    pub pan_display: Option<String>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<Rgb>>,
    pub automation_mode: Option<AutomationMode>,
}

impl TrackUpdate {
    pub fn volume(value: f32) -> Self {
        Self { volume: Some(value), ..Self::default() }
    }

    pub fn pan(value: f32) -> Self {
        Self { pan: Some(value), ..Self::default() }
    }

    pub fn apply(self, track: &mut Track) {
        apply_some!(self => track;
            name, volume, pan, mute, solo, rec_arm, selected,
            vu, vu_l, vu_r, volume_display, pan_display, color, automation_mode);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportUpdate {
    pub playing: Option<bool>,
    pub recording: Option<bool>,
    pub paused: Option<bool>,
    pub repeat: Option<bool>,
    pub tempo: Option<f32>,
    pub tempo_display: Option<String>,
    pub beat_display: Option<String>,
    pub time_display: Option<String>,
}

impl TransportUpdate {
    pub fn apply(self, transport: &mut Transport) {
        apply_some!(self => transport;
            playing, recording, paused, repeat,
            tempo, tempo_display, beat_display, time_display);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterUpdate {
    pub volume: Option<f32>,
    pub pan: Option<f32>,
    pub vu: Option<f32>,
    pub volume_display: Option<String>,
}

impl MasterUpdate {
    pub fn apply(self, master: &mut Master) {
        apply_some!(self => master; volume, pan, vu, volume_display);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendUpdate {
    pub name: Option<String>,
    pub volume: Option<f32>,
    pub volume_display: Option<String>,
    pub pan: Option<f32>,
}

impl SendUpdate {
    pub fn apply(self, send: &mut TrackSend) {
        apply_some!(self => send; name, volume, volume_display, pan);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FxUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FxParamUpdate {
    pub name: Option<String>,
    pub value: Option<f32>,
}

impl FxParamUpdate {
    pub fn apply(self, param: &mut FxParam) {
        apply_some!(self => param; name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automation_mode_cycles_through_all_five() {
        let mut mode = AutomationMode::Trim;
        let mut seen = Vec::new();
        for _ in 0..5 {
            mode = mode.next();
            seen.push(mode);
        }
        assert_eq!(
            seen,
            vec![
                AutomationMode::Read,
                AutomationMode::Touch,
                AutomationMode::Write,
                AutomationMode::Latch,
                AutomationMode::Trim,
            ]
        );
        assert_eq!(AutomationMode::from_index(3), Some(AutomationMode::Write));
        assert_eq!(AutomationMode::from_index(5), None);
        assert_eq!(AutomationMode::from_index(-1), None);
    }

    #[test]
    fn partial_update_touches_only_present_fields() {
        let mut track = Track::new(3);
        TrackUpdate {
            mute: Some(true),
            name: Some("Bass".into()),
            ..Default::default()
        }
        .apply(&mut track);
        assert!(track.mute);
        assert_eq!(track.name, "Bass");
        assert_eq!(track.volume, DEFAULT_VOLUME);
        assert_eq!(track.pan_display, "<C>");
    }
}
