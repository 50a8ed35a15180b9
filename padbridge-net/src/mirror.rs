//! Local copy of the clip grid.

use std::collections::HashMap;

use log::{debug, info};
use serde::Deserialize;

use padbridge_types::{ClipSlot, SlotState};

use crate::protocol::{MatrixUpdate, SlotChange, SlotUpdate};

#[derive(Deserialize, Default)]
struct SlotDoc {
    #[serde(default)]
    row: u32,
    #[serde(default)]
    clips: Vec<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct PlaySettingsDoc {
    #[serde(default)]
    track: Option<serde_json::Value>,
}

impl PlaySettingsDoc {
    /// Track ids are usually strings; numbers are accepted as their text.
    fn track_id(&self) -> Option<String> {
        match self.track.as_ref()? {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

#[derive(Deserialize, Default)]
struct ColumnDoc {
    #[serde(default)]
    clip_play_settings: Option<PlaySettingsDoc>,
    #[serde(default)]
    slots: Vec<SlotDoc>,
}

#[derive(Deserialize, Default)]
struct MatrixDoc {
    #[serde(default)]
    columns: Vec<ColumnDoc>,
    #[serde(default)]
    rows: Vec<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct SlotContentDoc {
    #[serde(default)]
    clips: Vec<serde_json::Value>,
}

/// Result of applying one matrix batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatrixOutcome {
    pub changed: bool,
    /// The engine asked for a full refetch.
    pub refetch: bool,
}

#[derive(Debug, Clone)]
pub struct ClipMirror {
    states: HashMap<(u32, u32), SlotState>,
    content: HashMap<(u32, u32), bool>,
    track_names: HashMap<String, String>,
    column_names: HashMap<u32, String>,
    num_columns: u32,
    num_rows: u32,
    tempo: f64,
}

impl Default for ClipMirror {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            content: HashMap::new(),
            track_names: HashMap::new(),
            column_names: HashMap::new(),
            num_columns: 0,
            num_rows: 0,
            tempo: 120.0,
        }
    }
}

impl ClipMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether any slot changed observably.
    pub fn apply_slot_updates(&mut self, updates: &[SlotUpdate]) -> bool {
        let mut changed = false;
        for update in updates {
            let key = (update.column, update.row);
            match &update.change {
                SlotChange::PlayState(play_state) => {
                    let state = SlotState::from(*play_state);
                    if self.states.insert(key, state) != Some(state) {
                        debug!(target: "clips", "slot {:?} -> {:?}", key, play_state);
                        changed = true;
                    }
                }
                SlotChange::CompletePersistentData(json) => {
                    match serde_json::from_str::<SlotContentDoc>(json) {
                        Ok(doc) => {
                            let has = !doc.clips.is_empty();
                            if self.content.insert(key, has) != Some(has) {
                                changed = true;
                            }
                        }
                        Err(e) => debug!(target: "clips", "bad slot data at {:?}: {}", key, e),
                    }
                }
            }
        }
        changed
    }

    /// Apply a matrix batch. Track lists are applied first so column names
    /// in persistent data of the same batch resolve.
    pub fn apply_matrix_updates(&mut self, updates: &[MatrixUpdate]) -> MatrixOutcome {
        let mut outcome = MatrixOutcome::default();

        for update in updates {
            if let MatrixUpdate::TrackList(tracks) = update {
                for track in tracks.iter().filter(|t| !t.id.is_empty()) {
                    self.track_names.insert(track.id.clone(), track.name.clone());
                }
            }
        }

        for update in updates {
            match update {
                MatrixUpdate::TrackList(_) => {}
                MatrixUpdate::Tempo(bpm) => {
                    if *bpm != self.tempo {
                        self.tempo = *bpm;
                        outcome.changed = true;
                    }
                }
                MatrixUpdate::CompletePersistentData(json) => {
                    outcome.changed |= self.load_matrix_data(json);
                }
                MatrixUpdate::EverythingHasChanged => outcome.refetch = true,
            }
        }
        outcome
    }

    /// Fold a full engine snapshot into the mirror. Slots the snapshot does
    /// not mention keep their state, so stream updates applied while the
    /// snapshot was in flight survive.
    pub fn merge_snapshot(&mut self, matrix: &[MatrixUpdate], slots: &[SlotUpdate]) -> bool {
        let outcome = self.apply_matrix_updates(matrix);
        let slots_changed = self.apply_slot_updates(slots);
        outcome.changed || slots_changed
    }

    fn load_matrix_data(&mut self, json: &str) -> bool {
        let doc: MatrixDoc = match serde_json::from_str(json) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(target: "clips", "bad matrix data: {}", e);
                return false;
            }
        };

        let mut content = HashMap::new();
        let mut column_names = HashMap::new();
        for (col, column) in (0u32..).zip(&doc.columns) {
            let name = column
                .clip_play_settings
                .as_ref()
                .and_then(PlaySettingsDoc::track_id)
                .and_then(|id| self.track_names.get(&id))
                .cloned()
                .unwrap_or_else(|| format!("Col {}", col + 1));
            column_names.insert(col, name);
            for slot in &column.slots {
                content.insert((col, slot.row), !slot.clips.is_empty());
            }
        }

        let num_columns = doc.columns.len() as u32;
        let num_rows = doc.rows.len() as u32;
        let changed = content != self.content
            || column_names != self.column_names
            || num_columns != self.num_columns
            || num_rows != self.num_rows;

        self.content = content;
        self.column_names = column_names;
        self.num_columns = num_columns;
        self.num_rows = num_rows;

        info!(
            target: "clips",
            "matrix: {} columns, {} rows, {} slots with content",
            self.num_columns,
            self.num_rows,
            self.content.values().filter(|has| **has).count()
        );
        changed
    }

    /// Raw state; unknown slots are empty.
    pub fn slot_state(&self, col: u32, row: u32) -> SlotState {
        self.states.get(&(col, row)).copied().unwrap_or_default()
    }

    pub fn slot(&self, col: u32, row: u32) -> ClipSlot {
        ClipSlot {
            column: col,
            row,
            state: self.slot_state(col, row),
            has_content: self.content.get(&(col, row)).copied().unwrap_or(false),
        }
    }

    /// `grid[row][col]` of display states starting at the given offsets.
    pub fn grid(&self, cols: u32, rows: u32, col_offset: u32, row_offset: u32) -> Vec<Vec<SlotState>> {
        (0..rows)
            .map(|row| {
                (0..cols)
                    .map(|col| self.slot(col + col_offset, row + row_offset).display_state())
                    .collect()
            })
            .collect()
    }

    pub fn column_name(&self, col: u32) -> String {
        self.column_names
            .get(&col)
            .cloned()
            .unwrap_or_else(|| format!("Col {}", col + 1))
    }

    pub fn num_columns(&self) -> u32 {
        self.num_columns
    }

    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PlayState, TrackInfo};

    const MATRIX: &str = r#"{
        "columns": [
            {"clip_play_settings": {"track": "t-bass"},
             "slots": [{"row": 0, "clips": [{}]}, {"row": 2, "clips": []}]},
            {"clip_play_settings": {"track": "t-unknown"}, "slots": []}
        ],
        "rows": [{}, {}, {}, {}]
    }"#;

    #[test]
    fn track_list_resolves_names_even_when_listed_after_data() {
        let mut mirror = ClipMirror::new();
        let outcome = mirror.apply_matrix_updates(&[
            MatrixUpdate::CompletePersistentData(MATRIX.to_string()),
            MatrixUpdate::TrackList(vec![TrackInfo {
                id: "t-bass".into(),
                name: "Bass".into(),
            }]),
        ]);
        assert!(outcome.changed);
        assert!(!outcome.refetch);
        assert_eq!(mirror.column_name(0), "Bass");
        assert_eq!(mirror.column_name(1), "Col 2");
        assert_eq!(mirror.num_columns(), 2);
        assert_eq!(mirror.num_rows(), 4);
        assert!(mirror.slot(0, 0).has_content);
        assert!(!mirror.slot(0, 2).has_content);
    }

    #[test]
    fn reapplying_same_data_is_not_a_change() {
        let mut mirror = ClipMirror::new();
        let batch = [MatrixUpdate::CompletePersistentData(MATRIX.to_string())];
        assert!(mirror.apply_matrix_updates(&batch).changed);
        assert!(!mirror.apply_matrix_updates(&batch).changed);
        assert!(!mirror
            .apply_matrix_updates(&[MatrixUpdate::CompletePersistentData("{oops".into())])
            .changed);
    }

    #[test]
    fn grid_renormalizes_stopped_without_content() {
        let mut mirror = ClipMirror::new();
        mirror.apply_matrix_updates(&[MatrixUpdate::CompletePersistentData(MATRIX.to_string())]);
        let changed = mirror.apply_slot_updates(&[
            SlotUpdate::play_state(0, 0, PlayState::Stopped),
            SlotUpdate::play_state(0, 2, PlayState::Stopped),
            SlotUpdate::play_state(1, 1, PlayState::ScheduledForPlayStart),
        ]);
        assert!(changed);

        let grid = mirror.grid(2, 3, 0, 0);
        assert_eq!(grid[0][0], SlotState::Stopped);
        assert_eq!(grid[2][0], SlotState::Empty);
        assert_eq!(grid[1][1], SlotState::Queued);
        assert_eq!(mirror.slot_state(0, 2), SlotState::Stopped);

        let offset = mirror.grid(1, 1, 1, 1);
        assert_eq!(offset, vec![vec![SlotState::Queued]]);
    }

    #[test]
    fn unchanged_slot_batch_reports_no_change() {
        let mut mirror = ClipMirror::new();
        let batch = [SlotUpdate::play_state(3, 3, PlayState::Playing)];
        assert!(mirror.apply_slot_updates(&batch));
        assert!(!mirror.apply_slot_updates(&batch));

        let content = SlotUpdate {
            column: 3,
            row: 3,
            change: SlotChange::CompletePersistentData(r#"{"clips":[{"id":1}]}"#.into()),
        };
        assert!(mirror.apply_slot_updates(&[content]));
        assert!(mirror.slot(3, 3).has_content);
    }

    #[test]
    fn snapshot_merge_keeps_slots_it_does_not_mention() {
        let mut mirror = ClipMirror::new();
        mirror.apply_slot_updates(&[
            SlotUpdate::play_state(2, 1, PlayState::Recording),
            SlotUpdate::play_state(0, 0, PlayState::Playing),
        ]);

        let changed = mirror.merge_snapshot(
            &[
                MatrixUpdate::CompletePersistentData(MATRIX.to_string()),
                MatrixUpdate::Tempo(140.0),
            ],
            &[SlotUpdate::play_state(0, 0, PlayState::Stopped)],
        );
        assert!(changed);
        assert_eq!(mirror.slot_state(2, 1), SlotState::Recording);
        assert_eq!(mirror.slot_state(0, 0), SlotState::Stopped);
        assert_eq!(mirror.tempo(), 140.0);
        assert_eq!(mirror.num_columns(), 2);
    }

    #[test]
    fn odd_column_settings_fall_back_to_column_number() {
        let matrix = r#"{
            "columns": [
                {"clip_play_settings": null, "slots": [{"row": 0, "clips": [{}]}]},
                {"clip_play_settings": {"track": 7}, "slots": []},
                {"clip_play_settings": {"track": ["t-bass"]}, "slots": []}
            ],
            "rows": [{}]
        }"#;
        let mut mirror = ClipMirror::new();
        let outcome = mirror.apply_matrix_updates(&[
            MatrixUpdate::TrackList(vec![TrackInfo {
                id: "7".into(),
                name: "Keys".into(),
            }]),
            MatrixUpdate::CompletePersistentData(matrix.to_string()),
        ]);
        assert!(outcome.changed);
        assert_eq!(mirror.num_columns(), 3);
        assert_eq!(mirror.column_name(0), "Col 1");
        assert_eq!(mirror.column_name(1), "Keys");
        assert_eq!(mirror.column_name(2), "Col 3");
        assert!(mirror.slot(0, 0).has_content);
    }

    #[test]
    fn everything_changed_requests_refetch() {
        let mut mirror = ClipMirror::new();
        let outcome = mirror.apply_matrix_updates(&[
            MatrixUpdate::Tempo(98.0),
            MatrixUpdate::EverythingHasChanged,
        ]);
        assert!(outcome.changed && outcome.refetch);
        assert_eq!(mirror.tempo(), 98.0);
    }
}
