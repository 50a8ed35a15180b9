//! Routes surface input to global bindings and the active mode.
//!
//! One mode is active at a time. The scale overlay is pushed on top of the
//! current mode and popped back off, so every `enter` has a matching `exit`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info, warn};
use padbridge_core::{CommandClient, DawStateStore};
use padbridge_net::ClipEngineClient;
use padbridge_types::{AutomationMode, Button, Color, Event, TrackUpdate};

use crate::display::Screen;
use crate::modes::{all_modes, paint_note_grid, Handled, Mode, ModeContext, ModeId};
use crate::output::Surface;
use crate::scales::ScaleState;

pub const ACTION_ADD_DEVICE: i32 = 40271;
pub const ACTION_ADD_TRACK: i32 = 40702;

/// Pitch bend channel for the touch strip.
const BEND_CHANNEL: u8 = 0;
const TOUCHSTRIP_MAX: f32 = 16383.0;

/// Everything the modes operate on, owned by the dispatcher.
pub struct ModeEnv {
    pub store: Arc<DawStateStore>,
    pub commands: CommandClient,
    pub clips: Option<Arc<ClipEngineClient>>,
    pub surface: Surface,
    pub scale: ScaleState,
}

impl ModeEnv {
    pub fn ctx(&mut self) -> ModeContext<'_> {
        ModeContext {
            store: &self.store,
            commands: &self.commands,
            clips: self.clips.as_deref(),
            surface: &mut self.surface,
            scale: &mut self.scale,
        }
    }
}

fn automation_color(mode: AutomationMode) -> Color {
    match mode {
        AutomationMode::Trim => Color::DarkGray,
        AutomationMode::Read => Color::Green,
        AutomationMode::Touch => Color::Yellow,
        AutomationMode::Write => Color::Red,
        AutomationMode::Latch => Color::Orange,
    }
}

/// Mode reached from a mode button, toggling back to the mixer.
fn mode_button(button: Button) -> Option<ModeId> {
    match button {
        Button::Note => Some(ModeId::Drum),
        Button::Device => Some(ModeId::Device),
        Button::Session => Some(ModeId::Session),
        Button::Browse => Some(ModeId::Browser),
        _ => None,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

pub struct ModeDispatcher {
    modes: Vec<Box<dyn Mode>>,
    active_index: usize,
    /// Modes suspended under an overlay.
    stack: Vec<usize>,
    shift_held: bool,
    env: ModeEnv,
}

impl ModeDispatcher {
    pub fn new(env: ModeEnv) -> Self {
        Self::with_modes(env, all_modes())
    }

    /// `modes` must contain a mixer mode; it starts active.
    pub fn with_modes(env: ModeEnv, modes: Vec<Box<dyn Mode>>) -> Self {
        let active_index = modes
            .iter()
            .position(|m| m.id() == ModeId::Mixer)
            .unwrap_or(0);
        Self {
            modes,
            active_index,
            stack: Vec::new(),
            shift_held: false,
            env,
        }
    }

    pub fn active(&self) -> ModeId {
        self.modes[self.active_index].id()
    }

    pub fn shift_held(&self) -> bool {
        self.shift_held
    }

    pub fn store(&self) -> &DawStateStore {
        &self.env.store
    }

    fn index_of(&self, id: ModeId) -> Option<usize> {
        self.modes.iter().position(|m| m.id() == id)
    }

    fn overlay_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The mode under the overlay, or the active one.
    fn base_mode(&self) -> ModeId {
        match self.stack.last() {
            Some(&index) => self.modes[index].id(),
            None => self.active(),
        }
    }

    /// Run `f` against the active mode. A panic inside the mode is logged
    /// and reported as `None`.
    fn with_active<R>(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut dyn Mode, &mut ModeContext) -> R,
    ) -> Option<R> {
        let mode = self.modes[self.active_index].as_mut();
        let id = mode.id();
        let mut ctx = self.env.ctx();
        match panic::catch_unwind(AssertUnwindSafe(|| f(mode, &mut ctx))) {
            Ok(result) => Some(result),
            Err(payload) => {
                error!(
                    target: "modes",
                    "{} mode panicked in {}: {}",
                    id.name(),
                    what,
                    panic_message(payload.as_ref())
                );
                None
            }
        }
    }

    fn refresh_transport_leds(&mut self) {
        let transport = self.env.store.transport();
        self.env
            .surface
            .transport_leds(transport.playing, transport.recording);
    }

    /// Enter the initial mode and light the transport.
    pub fn start(&mut self) {
        info!(target: "modes", "starting in {} mode", self.active().name());
        self.with_active("enter", |mode, ctx| mode.enter(ctx));
        self.refresh_transport_leds();
    }

    fn transition(&mut self, index: usize) {
        let from = self.active();
        self.with_active("exit", |mode, ctx| mode.exit(ctx));
        self.active_index = index;
        self.with_active("enter", |mode, ctx| mode.enter(ctx));
        info!(target: "modes", "mode {} -> {}", from.name(), self.active().name());
    }

    fn open_overlay(&mut self, id: ModeId) {
        let Some(index) = self.index_of(id) else {
            warn!(target: "modes", "no {} mode registered", id.name());
            return;
        };
        self.stack.push(self.active_index);
        self.transition(index);
    }

    fn close_overlay(&mut self) {
        if let Some(index) = self.stack.pop() {
            self.transition(index);
        }
    }

    /// Make `id` the active mode. Leaving the overlay restores the mode it
    /// suspended before switching on.
    pub fn switch(&mut self, id: ModeId) {
        if id == self.active() {
            return;
        }
        if self.overlay_active() {
            self.close_overlay();
            if id == self.active() {
                return;
            }
        }
        if id == ModeId::Scale {
            self.open_overlay(id);
            return;
        }
        match self.index_of(id) {
            Some(index) => self.transition(index),
            None => warn!(target: "modes", "no {} mode registered", id.name()),
        }
    }

    pub fn toggle_overlay(&mut self) {
        if self.overlay_active() {
            self.close_overlay();
        } else {
            self.open_overlay(ModeId::Scale);
        }
    }

    /// Switch to `id`, or back to the mixer if it is already showing.
    fn toggle_mode(&mut self, id: ModeId) {
        if self.base_mode() == id {
            self.switch(ModeId::Mixer);
        } else {
            self.switch(id);
        }
    }

    fn cycle_automation(&mut self) {
        let store = &self.env.store;
        let track = store.selected_track();
        let Some(current) = store.get_track(track) else {
            debug!(target: "modes", "automation: track {} not reported yet", track);
            return;
        };
        let mode = current.automation_mode.next();
        self.env.commands.set_track_automode(track, mode);
        store.update_track(
            track,
            TrackUpdate {
                automation_mode: Some(mode),
                ..Default::default()
            },
        );
        self.env.surface.button(Button::Automate, automation_color(mode));
        info!(target: "modes", "track {} automation {}", track, mode.name());
    }

    fn shift_octave(&mut self, up: bool) {
        let moved = if up {
            self.env.scale.octave_up()
        } else {
            self.env.scale.octave_down()
        };
        let shows_notes = !matches!(self.base_mode(), ModeId::Drum | ModeId::Session);
        if moved && shows_notes {
            paint_note_grid(&mut self.env.ctx());
        }
    }

    fn page(&mut self, button: Button) {
        if self.active() == ModeId::Scale {
            self.deliver_button(button);
            return;
        }
        let (commands, store) = (&self.env.commands, &self.env.store);
        if button == Button::PageLeft {
            commands.prev_track_bank();
            store.prev_bank();
        } else {
            commands.next_track_bank();
            store.next_bank();
        }
        debug!(target: "modes", "bank offset {}", store.bank_offset());
    }

    /// Hand `button` to the active mode. An overlay that does not want it
    /// closes, and the restored mode gets the button instead.
    fn deliver_button(&mut self, button: Button) {
        let handled = self.with_active("button", |mode, ctx| mode.handle_button(ctx, button));
        if handled == Some(Handled::No) && self.overlay_active() {
            self.close_overlay();
            self.with_active("button", |mode, ctx| mode.handle_button(ctx, button));
        }
    }

    fn handle_button(&mut self, button: Button) {
        let commands = &self.env.commands;
        match button {
            Button::Shift => self.shift_held = true,
            Button::Undo if self.shift_held => commands.redo(),
            Button::Undo => commands.undo(),
            Button::Scale => self.toggle_overlay(),
            Button::OctaveUp => self.shift_octave(true),
            Button::OctaveDown => self.shift_octave(false),
            Button::Play => commands.play(),
            Button::Stop => commands.stop(),
            Button::Record => commands.record(),
            Button::Metronome => commands.click(),
            Button::Repeat => commands.repeat(),
            Button::PageLeft | Button::PageRight => self.page(button),
            Button::Left => commands.prev_track(),
            Button::Right => commands.next_track(),
            Button::Master => info!(target: "modes", "master button"),
            Button::AddDevice => commands.trigger_action(ACTION_ADD_DEVICE),
            Button::AddTrack => commands.trigger_action(ACTION_ADD_TRACK),
            Button::Automate => self.cycle_automation(),
            Button::Mix => self.switch(ModeId::Mixer),
            other => match mode_button(other) {
                Some(id) => self.toggle_mode(id),
                None => self.deliver_button(other),
            },
        }
    }

    /// Process one event from the bus.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::ButtonPressed(button) => self.handle_button(button),
            Event::ButtonReleased(Button::Shift) => self.shift_held = false,
            Event::ButtonReleased(_) => {}
            Event::PadPressed { row, col, velocity } => {
                self.with_active("pad", |mode, ctx| mode.handle_pad_pressed(ctx, row, col, velocity));
            }
            Event::PadReleased { row, col } => {
                self.with_active("pad", |mode, ctx| mode.handle_pad_released(ctx, row, col));
            }
            Event::PadAftertouch { row, col, value } => {
                self.with_active("aftertouch", |mode, ctx| {
                    mode.handle_aftertouch(ctx, row, col, value)
                });
            }
            Event::EncoderRotated { encoder, delta } => {
                self.with_active("encoder", |mode, ctx| mode.handle_encoder(ctx, encoder, delta));
            }
            Event::Touchstrip(value) => {
                let bend = f32::from(value) / TOUCHSTRIP_MAX;
                self.env.commands.pitch_bend(BEND_CHANNEL, bend);
            }
            Event::StateChanged(change) => {
                self.with_active("state change", |mode, ctx| {
                    mode.handle_state_change(ctx, change)
                });
                self.refresh_transport_leds();
            }
            Event::ClipStateChanged(change) => {
                self.with_active("clip change", |mode, ctx| mode.handle_clip_change(ctx, change));
            }
        }
    }

    /// Render the active mode and push the screen to the display.
    pub fn render(&mut self) -> Option<Screen> {
        let screen = self.with_active("render", |mode, ctx| mode.render(ctx))?;
        self.env.surface.write_screen(&screen);
        Some(screen)
    }

    /// Turn the surface dark.
    pub fn shutdown(&mut self) {
        self.env.surface.clear_all();
    }
}
