//! Local mirror of DAW state.
//!
//! Mutated by the feedback router (and optimistically by modes after a
//! nudge), read by modes and renderers. Every mutator applies its partial
//! update under the write lock and publishes `StateChanged` after the lock is
//! released.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use padbridge_types::{
    Event, Fx, FxParam, FxParamUpdate, FxUpdate, Master, MasterUpdate, SendUpdate, StateChange,
    Track, TrackSend, TrackUpdate, Transport, TransportUpdate, BANK_SIZE, MAX_FX, MAX_FX_PARAMS,
    MAX_SENDS, MAX_TRACKS,
};

use crate::event_bus::EventBus;

/// Snapshot-able DAW state. Tracks and FX chains are created on first
/// reference and never removed.
#[derive(Debug, Clone)]
pub struct DawState {
    pub tracks: BTreeMap<u32, Track>,
    pub fx: BTreeMap<u32, Vec<Fx>>,
    pub transport: Transport,
    pub master: Master,
    /// First visible track minus one; always a multiple of the bank size.
    pub bank_offset: u32,
    pub selected_track: u32,
}

impl Default for DawState {
    fn default() -> Self {
        Self {
            tracks: BTreeMap::new(),
            fx: BTreeMap::new(),
            transport: Transport::default(),
            master: Master::default(),
            bank_offset: 0,
            selected_track: 1,
        }
    }
}

impl DawState {
    /// Track `n`, or its defaults when the DAW has not reported it yet.
    pub fn track_or_default(&self, n: u32) -> Track {
        self.tracks.get(&n).cloned().unwrap_or_else(|| Track::new(n))
    }

    /// The eight tracks of the visible bank.
    pub fn bank_tracks(&self) -> Vec<Track> {
        let start = self.bank_offset + 1;
        (start..start + BANK_SIZE).map(|n| self.track_or_default(n)).collect()
    }

    fn ensure_track(&mut self, n: u32) -> Option<&mut Track> {
        if n == 0 || n > MAX_TRACKS {
            return None;
        }
        Some(self.tracks.entry(n).or_insert_with(|| Track::new(n)))
    }

    fn ensure_fx(&mut self, track: u32, fx: usize) -> Option<&mut Fx> {
        if track == 0 || track > MAX_TRACKS {
            return None;
        }
        ensure_index(self.fx.entry(track).or_default(), fx, MAX_FX, Fx::new)
    }
}

/// Grow `items` so that `index` exists, bounded by `limit`.
fn ensure_index<T>(
    items: &mut Vec<T>,
    index: usize,
    limit: usize,
    make: impl Fn(usize) -> T,
) -> Option<&mut T> {
    if index >= limit {
        return None;
    }
    while items.len() <= index {
        items.push(make(items.len()));
    }
    items.get_mut(index)
}

pub struct DawStateStore {
    state: RwLock<DawState>,
    bus: EventBus,
    dirty: AtomicBool,
}

impl DawStateStore {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: RwLock::new(DawState::default()),
            bus,
            dirty: AtomicBool::new(true),
        }
    }

    // --- Mutators ---

    /// Apply a partial update to track `n` (1-based). Returns false when `n`
    /// is outside the track pool.
    pub fn update_track(&self, n: u32, update: TrackUpdate) -> bool {
        {
            let mut state = self.write();
            let select = update.selected == Some(true);
            let Some(track) = state.ensure_track(n) else {
                debug!(target: "state", "dropping update for out-of-range track {}", n);
                return false;
            };
            update.apply(track);
            if select {
                state.selected_track = n;
            }
        }
        self.changed(StateChange::Track { track: n });
        true
    }

    pub fn update_transport(&self, update: TransportUpdate) {
        update.apply(&mut self.write().transport);
        self.changed(StateChange::Transport);
    }

    pub fn update_master(&self, update: MasterUpdate) {
        update.apply(&mut self.write().master);
        self.changed(StateChange::Master);
    }

    /// Apply a partial update to send `send` (0-based) of track `track`.
    pub fn update_send(&self, track: u32, send: usize, update: SendUpdate) -> bool {
        {
            let mut state = self.write();
            let slot = state
                .ensure_track(track)
                .and_then(|t| ensure_index(&mut t.sends, send, MAX_SENDS, TrackSend::new));
            let Some(slot) = slot else {
                debug!(target: "state", "dropping send update {}:{}", track, send);
                return false;
            };
            update.apply(slot);
        }
        self.changed(StateChange::Send { track, send });
        true
    }

    pub fn update_fx(&self, track: u32, fx: usize, update: FxUpdate) -> bool {
        {
            let mut state = self.write();
            let Some(slot) = state.ensure_fx(track, fx) else {
                debug!(target: "state", "dropping fx update {}:{}", track, fx);
                return false;
            };
            if let Some(name) = update.name {
                slot.name = name;
            }
        }
        self.changed(StateChange::Fx { track, fx });
        true
    }

    pub fn update_fx_param(
        &self,
        track: u32,
        fx: usize,
        param: usize,
        update: FxParamUpdate,
    ) -> bool {
        {
            let mut state = self.write();
            let slot = state
                .ensure_fx(track, fx)
                .and_then(|f| ensure_index(&mut f.params, param, MAX_FX_PARAMS, FxParam::new));
            let Some(slot) = slot else {
                debug!(target: "state", "dropping fx param update {}:{}:{}", track, fx, param);
                return false;
            };
            update.apply(slot);
        }
        self.changed(StateChange::FxParam { track, fx, param });
        true
    }

    // --- Bank cursor ---

    /// Move the visible bank. Offsets snap down to a bank boundary.
    pub fn set_bank(&self, offset: u32) {
        let offset = {
            let mut state = self.write();
            let limit = MAX_TRACKS - BANK_SIZE;
            state.bank_offset = (offset.min(limit) / BANK_SIZE) * BANK_SIZE;
            state.bank_offset
        };
        self.changed(StateChange::Bank { offset });
    }

    pub fn next_bank(&self) {
        self.set_bank(self.bank_offset() + BANK_SIZE);
    }

    pub fn prev_bank(&self) {
        self.set_bank(self.bank_offset().saturating_sub(BANK_SIZE));
    }

    // --- Readers ---

    pub fn get_track(&self, n: u32) -> Option<Track> {
        self.read().tracks.get(&n).cloned()
    }

    pub fn track_or_default(&self, n: u32) -> Track {
        self.read().track_or_default(n)
    }

    pub fn get_bank_tracks(&self) -> Vec<Track> {
        self.read().bank_tracks()
    }

    pub fn get_send(&self, track: u32, send: usize) -> Option<TrackSend> {
        self.read().tracks.get(&track)?.sends.get(send).cloned()
    }

    pub fn get_fx(&self, track: u32, fx: usize) -> Option<Fx> {
        self.read().fx.get(&track)?.get(fx).cloned()
    }

    pub fn fx_chain(&self, track: u32) -> Vec<Fx> {
        self.read().fx.get(&track).cloned().unwrap_or_default()
    }

    pub fn transport(&self) -> Transport {
        self.read().transport.clone()
    }

    pub fn master(&self) -> Master {
        self.read().master.clone()
    }

    pub fn bank_offset(&self) -> u32 {
        self.read().bank_offset
    }

    pub fn selected_track(&self) -> u32 {
        self.read().selected_track
    }

    /// Run `f` against the state under a single read lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&DawState) -> R) -> R {
        f(&self.read())
    }

    /// Whether anything changed since the last call.
    pub fn consume_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    fn changed(&self, change: StateChange) {
        self.dirty.store(true, Ordering::Release);
        self.bus.publish(Event::StateChanged(change));
    }

    fn read(&self) -> RwLockReadGuard<'_, DawState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DawState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
