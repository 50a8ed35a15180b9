//! Wire protocol for the clip engine.
//!
//! Unary requests get exactly one reply on the same connection. A
//! `Subscribe` request turns the connection into a stream of update batches
//! that lasts until either side closes it.

use serde::{Deserialize, Serialize};

use padbridge_types::SlotState;

/// Which update stream a subscription carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Per-slot play state and clip content.
    Slots,
    /// Matrix layout, track list and tempo.
    Matrix,
}

impl StreamKind {
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Slots => "slots",
            StreamKind::Matrix => "matrix",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotAction {
    Trigger,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowAction {
    Play,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnAction {
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixAction {
    StopAllClips,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClipRequest {
    Subscribe {
        stream: StreamKind,
        matrix_id: u32,
    },
    /// Full state, answered with `ClipReply::Snapshot`.
    GetMatrix {
        matrix_id: u32,
    },
    TriggerSlot {
        matrix_id: u32,
        column: u32,
        row: u32,
        action: SlotAction,
    },
    TriggerRow {
        matrix_id: u32,
        row: u32,
        action: RowAction,
    },
    TriggerColumn {
        matrix_id: u32,
        column: u32,
        action: ColumnAction,
    },
    TriggerMatrix {
        matrix_id: u32,
        action: MatrixAction,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClipReply {
    Ack,
    Error { message: String },
    Snapshot {
        slots: Vec<SlotUpdate>,
        matrix: Vec<MatrixUpdate>,
    },
    SlotUpdates { updates: Vec<SlotUpdate> },
    MatrixUpdates { updates: Vec<MatrixUpdate> },
}

/// Engine-side slot play state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    Unknown,
    Stopped,
    ScheduledForPlayStart,
    Playing,
    Paused,
    ScheduledForPlayStop,
    ScheduledForPlayRestart,
    ScheduledForRecordStart,
    Recording,
    ScheduledForRecordStop,
    Ignited,
}

impl From<PlayState> for SlotState {
    fn from(state: PlayState) -> Self {
        match state {
            PlayState::Unknown => SlotState::Empty,
            PlayState::Stopped
            | PlayState::Paused
            | PlayState::ScheduledForPlayStop
            | PlayState::ScheduledForRecordStop => SlotState::Stopped,
            PlayState::Playing => SlotState::Playing,
            PlayState::Recording => SlotState::Recording,
            PlayState::ScheduledForPlayStart
            | PlayState::ScheduledForPlayRestart
            | PlayState::ScheduledForRecordStart
            | PlayState::Ignited => SlotState::Queued,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotChange {
    PlayState(PlayState),
    /// JSON document `{"clips": [...]}`.
    CompletePersistentData(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub column: u32,
    pub row: u32,
    pub change: SlotChange,
}

impl SlotUpdate {
    pub fn play_state(column: u32, row: u32, state: PlayState) -> Self {
        Self {
            column,
            row,
            change: SlotChange::PlayState(state),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatrixUpdate {
    TrackList(Vec<TrackInfo>),
    Tempo(f64),
    /// JSON document describing columns, their slots and rows.
    CompletePersistentData(String),
    EverythingHasChanged,
}
