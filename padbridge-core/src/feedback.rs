//! OSC feedback listener.
//!
//! REAPER pushes state changes as OSC messages whose addresses embed track,
//! send, FX and parameter numbers. Each address is matched against an
//! ordered table of templates (`*` matches exactly one path segment); the
//! first match wins. Payloads are validated before they reach the store:
//! non-numeric values for numeric fields and normalized values outside
//! [0, 1] are discarded.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use rosc::{OscMessage, OscPacket, OscType};

use padbridge_types::{
    AutomationMode, FxParamUpdate, FxUpdate, MasterUpdate, Rgb, SendUpdate, TrackUpdate,
    TransportUpdate,
};

use crate::store::DawStateStore;

/// Unmatched addresses logged before going quiet.
const UNMATCHED_LOG_LIMIT: usize = 5;

const RECV_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFlag {
    Play,
    Record,
    Pause,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportText {
    Tempo,
    Beat,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterLevel {
    Volume,
    Pan,
    Vu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackLevel {
    Volume,
    Pan,
    Vu,
    VuLeft,
    VuRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFlag {
    Mute,
    Solo,
    RecArm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackText {
    Name,
    VolumeDisplay,
    PanDisplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendLevel {
    Volume,
    Pan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendText {
    Name,
    VolumeDisplay,
}

/// What a matched address updates. Captured ids are read positionally:
/// track first, then send or FX, then parameter. Send, FX and parameter
/// numbers are 1-based on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    TransportFlag(TransportFlag),
    Stop,
    Tempo,
    TransportText(TransportText),
    MasterLevel(MasterLevel),
    MasterVolumeText,
    TrackLevel(TrackLevel),
    TrackFlag(TrackFlag),
    TrackSelect,
    TrackText(TrackText),
    TrackColor,
    TrackAutomode,
    SendLevel(SendLevel),
    SendText(SendText),
    FxName,
    FxParamValue,
    FxParamName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The store was updated.
    Applied,
    /// Matched, but the message carries nothing to apply (e.g. `/stop 0`).
    Ignored,
    /// Matched, but ids or payload failed validation.
    Rejected,
    Unmatched,
}

struct Route {
    template: String,
    pattern: Regex,
    target: Target,
}

/// Ordered address-template table.
pub struct RouteTable {
    routes: Vec<Route>,
    unmatched: AtomicUsize,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            unmatched: AtomicUsize::new(0),
        }
    }

    /// Append a template. Earlier registrations take precedence.
    pub fn register(&mut self, template: &str, target: Target) -> Result<&mut Self, regex::Error> {
        let body: Vec<String> = template
            .split('/')
            .map(|segment| {
                if segment == "*" {
                    "([^/]+)".to_string()
                } else {
                    regex::escape(segment)
                }
            })
            .collect();
        let pattern = Regex::new(&format!("^{}$", body.join("/")))?;
        self.routes.push(Route {
            template: template.to_string(),
            pattern,
            target,
        });
        Ok(self)
    }

    /// The table for REAPER's default OSC pattern config. Per-send and per-FX
    /// templates come before the generic per-track ones.
    pub fn reaper() -> Self {
        const ROUTES: &[(&str, Target)] = &[
            ("/play", Target::TransportFlag(TransportFlag::Play)),
            ("/record", Target::TransportFlag(TransportFlag::Record)),
            ("/pause", Target::TransportFlag(TransportFlag::Pause)),
            ("/repeat", Target::TransportFlag(TransportFlag::Repeat)),
            ("/stop", Target::Stop),
            ("/tempo/raw", Target::Tempo),
            ("/tempo/str", Target::TransportText(TransportText::Tempo)),
            ("/beat/str", Target::TransportText(TransportText::Beat)),
            ("/time/str", Target::TransportText(TransportText::Time)),
            ("/master/volume", Target::MasterLevel(MasterLevel::Volume)),
            ("/master/pan", Target::MasterLevel(MasterLevel::Pan)),
            ("/master/vu", Target::MasterLevel(MasterLevel::Vu)),
            ("/master/volume/str", Target::MasterVolumeText),
            ("/track/*/send/*/volume", Target::SendLevel(SendLevel::Volume)),
            ("/track/*/send/*/pan", Target::SendLevel(SendLevel::Pan)),
            ("/track/*/send/*/name", Target::SendText(SendText::Name)),
            ("/track/*/send/*/volume/str", Target::SendText(SendText::VolumeDisplay)),
            ("/track/*/fx/*/name", Target::FxName),
            ("/track/*/fx/*/fxparam/*/value", Target::FxParamValue),
            ("/track/*/fx/*/fxparam/*/name", Target::FxParamName),
            ("/track/*/volume", Target::TrackLevel(TrackLevel::Volume)),
            ("/track/*/pan", Target::TrackLevel(TrackLevel::Pan)),
            ("/track/*/vu", Target::TrackLevel(TrackLevel::Vu)),
            ("/track/*/vu/L", Target::TrackLevel(TrackLevel::VuLeft)),
            ("/track/*/vu/R", Target::TrackLevel(TrackLevel::VuRight)),
            ("/track/*/mute", Target::TrackFlag(TrackFlag::Mute)),
            ("/track/*/solo", Target::TrackFlag(TrackFlag::Solo)),
            ("/track/*/recarm", Target::TrackFlag(TrackFlag::RecArm)),
            ("/track/*/select", Target::TrackSelect),
            ("/track/*/name", Target::TrackText(TrackText::Name)),
            ("/track/*/volume/str", Target::TrackText(TrackText::VolumeDisplay)),
            ("/track/*/pan/str", Target::TrackText(TrackText::PanDisplay)),
            ("/track/*/color", Target::TrackColor),
            ("/track/*/automode", Target::TrackAutomode),
        ];

        let mut table = Self::new();
        for (template, target) in ROUTES {
            table
                .register(template, *target)
                .expect("built-in OSC templates are valid patterns");
        }
        table
    }

    /// Template that `addr` resolves to, if any.
    pub fn matching_template(&self, addr: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.pattern.is_match(addr))
            .map(|r| r.template.as_str())
    }

    pub fn route(&self, msg: &OscMessage, store: &DawStateStore) -> RouteOutcome {
        for route in &self.routes {
            if let Some(caps) = route.pattern.captures(&msg.addr) {
                let ids: Vec<&str> = caps.iter().skip(1).flatten().map(|m| m.as_str()).collect();
                let outcome = apply(route.target, &ids, &msg.args, store);
                if outcome == RouteOutcome::Rejected {
                    debug!(target: "feedback", "rejected {} {:?}", msg.addr, msg.args);
                }
                return outcome;
            }
        }
        self.log_unmatched(&msg.addr);
        RouteOutcome::Unmatched
    }

    pub fn route_packet(&self, packet: &OscPacket, store: &DawStateStore) {
        match packet {
            OscPacket::Message(msg) => {
                self.route(msg, store);
            }
            OscPacket::Bundle(bundle) => {
                for p in &bundle.content {
                    self.route_packet(p, store);
                }
            }
        }
    }

    fn log_unmatched(&self, addr: &str) {
        let seen = self.unmatched.fetch_add(1, Ordering::Relaxed) + 1;
        if seen <= UNMATCHED_LOG_LIMIT {
            info!(target: "feedback", "unmatched OSC address: {}", addr);
        } else if seen == UNMATCHED_LOG_LIMIT + 1 {
            info!(target: "feedback", "(suppressing further unmatched OSC logs)");
        }
    }
}

// --- Payload coercion ---

fn number(args: &[OscType]) -> Option<f64> {
    let value = match args.first()? {
        OscType::Float(v) => *v as f64,
        OscType::Double(v) => *v,
        OscType::Int(v) => *v as f64,
        OscType::Long(v) => *v as f64,
        OscType::Bool(v) => f64::from(u8::from(*v)),
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn normalized(args: &[OscType]) -> Option<f32> {
    number(args)
        .filter(|v| (0.0..=1.0).contains(v))
        .map(|v| v as f32)
}

fn flag(args: &[OscType]) -> Option<bool> {
    number(args).map(|v| v != 0.0)
}

fn text(args: &[OscType]) -> Option<String> {
    match args.first()? {
        OscType::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Parse capture `i` as an integer id.
fn id(ids: &[&str], i: usize) -> Option<u32> {
    ids.get(i)?.parse().ok()
}

/// Parse capture `i` as a 1-based wire index and convert it to 0-based.
fn index(ids: &[&str], i: usize) -> Option<usize> {
    id(ids, i)?.checked_sub(1).map(|v| v as usize)
}

fn outcome(applied: bool) -> RouteOutcome {
    if applied {
        RouteOutcome::Applied
    } else {
        RouteOutcome::Rejected
    }
}

fn apply(target: Target, ids: &[&str], args: &[OscType], store: &DawStateStore) -> RouteOutcome {
    match apply_inner(target, ids, args, store) {
        Some(result) => result,
        None => RouteOutcome::Rejected,
    }
}

fn apply_inner(
    target: Target,
    ids: &[&str],
    args: &[OscType],
    store: &DawStateStore,
) -> Option<RouteOutcome> {
    let result = match target {
        Target::TransportFlag(which) => {
            let on = Some(flag(args)?);
            let mut update = TransportUpdate::default();
            match which {
                TransportFlag::Play => update.playing = on,
                TransportFlag::Record => update.recording = on,
                TransportFlag::Pause => update.paused = on,
                TransportFlag::Repeat => update.repeat = on,
            }
            store.update_transport(update);
            RouteOutcome::Applied
        }
        Target::Stop => {
            if !flag(args)? {
                return Some(RouteOutcome::Ignored);
            }
            store.update_transport(TransportUpdate {
                playing: Some(false),
                paused: Some(false),
                ..Default::default()
            });
            RouteOutcome::Applied
        }
        Target::Tempo => {
            let bpm = number(args).filter(|v| *v > 0.0)?;
            store.update_transport(TransportUpdate {
                tempo: Some(bpm as f32),
                ..Default::default()
            });
            RouteOutcome::Applied
        }
        Target::TransportText(which) => {
            let value = Some(text(args)?);
            let mut update = TransportUpdate::default();
            match which {
                TransportText::Tempo => update.tempo_display = value,
                TransportText::Beat => update.beat_display = value,
                TransportText::Time => update.time_display = value,
            }
            store.update_transport(update);
            RouteOutcome::Applied
        }
        Target::MasterLevel(which) => {
            let value = Some(normalized(args)?);
            let mut update = MasterUpdate::default();
            match which {
                MasterLevel::Volume => update.volume = value,
                MasterLevel::Pan => update.pan = value,
                MasterLevel::Vu => update.vu = value,
            }
            store.update_master(update);
            RouteOutcome::Applied
        }
        Target::MasterVolumeText => {
            store.update_master(MasterUpdate {
                volume_display: Some(text(args)?),
                ..Default::default()
            });
            RouteOutcome::Applied
        }
        Target::TrackLevel(which) => {
            let track = id(ids, 0)?;
            let value = Some(normalized(args)?);
            let mut update = TrackUpdate::default();
            match which {
                TrackLevel::Volume => update.volume = value,
                TrackLevel::Pan => update.pan = value,
                TrackLevel::Vu => update.vu = value,
                TrackLevel::VuLeft => update.vu_l = value,
                TrackLevel::VuRight => update.vu_r = value,
            }
            outcome(store.update_track(track, update))
        }
        Target::TrackFlag(which) => {
            let track = id(ids, 0)?;
            let on = Some(flag(args)?);
            let mut update = TrackUpdate::default();
            match which {
                TrackFlag::Mute => update.mute = on,
                TrackFlag::Solo => update.solo = on,
                TrackFlag::RecArm => update.rec_arm = on,
            }
            outcome(store.update_track(track, update))
        }
        Target::TrackSelect => {
            let track = id(ids, 0)?;
            let update = TrackUpdate {
                selected: Some(flag(args)?),
                ..Default::default()
            };
            outcome(store.update_track(track, update))
        }
        Target::TrackText(which) => {
            let track = id(ids, 0)?;
            let value = Some(text(args)?);
            let mut update = TrackUpdate::default();
            match which {
                TrackText::Name => update.name = value,
                TrackText::VolumeDisplay => update.volume_display = value,
                TrackText::PanDisplay => update.pan_display = value,
            }
            outcome(store.update_track(track, update))
        }
        Target::TrackColor => {
            let track = id(ids, 0)?;
            let packed = number(args).filter(|v| *v >= 0.0)? as u32;
            let color = (packed != 0).then(|| Rgb::from_packed(packed));
            let update = TrackUpdate {
                color: Some(color),
                ..Default::default()
            };
            outcome(store.update_track(track, update))
        }
        Target::TrackAutomode => {
            let track = id(ids, 0)?;
            let mode = AutomationMode::from_index(number(args)? as i64)?;
            let update = TrackUpdate {
                automation_mode: Some(mode),
                ..Default::default()
            };
            outcome(store.update_track(track, update))
        }
        Target::SendLevel(which) => {
            let (track, send) = (id(ids, 0)?, index(ids, 1)?);
            let value = Some(normalized(args)?);
            let mut update = SendUpdate::default();
            match which {
                SendLevel::Volume => update.volume = value,
                SendLevel::Pan => update.pan = value,
            }
            outcome(store.update_send(track, send, update))
        }
        Target::SendText(which) => {
            let (track, send) = (id(ids, 0)?, index(ids, 1)?);
            let value = Some(text(args)?);
            let mut update = SendUpdate::default();
            match which {
                SendText::Name => update.name = value,
                SendText::VolumeDisplay => update.volume_display = value,
            }
            outcome(store.update_send(track, send, update))
        }
        Target::FxName => {
            let (track, fx) = (id(ids, 0)?, index(ids, 1)?);
            let update = FxUpdate { name: Some(text(args)?) };
            outcome(store.update_fx(track, fx, update))
        }
        Target::FxParamValue => {
            let (track, fx, param) = (id(ids, 0)?, index(ids, 1)?, index(ids, 2)?);
            let update = FxParamUpdate {
                value: Some(normalized(args)?),
                ..Default::default()
            };
            outcome(store.update_fx_param(track, fx, param, update))
        }
        Target::FxParamName => {
            let (track, fx, param) = (id(ids, 0)?, index(ids, 1)?, index(ids, 2)?);
            let update = FxParamUpdate {
                name: Some(text(args)?),
                ..Default::default()
            };
            outcome(store.update_fx_param(track, fx, param, update))
        }
    };
    Some(result)
}

/// Owns the listening socket and its receive thread.
pub struct FeedbackRouter {
    port: u16,
    routes: Arc<RouteTable>,
    store: Arc<DawStateStore>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl FeedbackRouter {
    pub fn new(port: u16, store: Arc<DawStateStore>) -> Self {
        Self::with_routes(port, store, RouteTable::reaper())
    }

    pub fn with_routes(port: u16, store: Arc<DawStateStore>, routes: RouteTable) -> Self {
        Self {
            port,
            routes: Arc::new(routes),
            store,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            local_addr: None,
        }
    }

    /// Bind the listener and spawn the receive loop. Calling `start` on a
    /// running router returns the existing address.
    pub fn start(&mut self) -> io::Result<SocketAddr> {
        if let (true, Some(addr)) = (self.is_running(), self.local_addr) {
            return Ok(addr);
        }

        let socket = UdpSocket::bind(("0.0.0.0", self.port))?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let addr = socket.local_addr()?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let routes = Arc::clone(&self.routes);
        let store = Arc::clone(&self.store);

        let handle = thread::Builder::new()
            .name("osc-feedback".into())
            .spawn(move || receive_loop(socket, &routes, &store, &running))?;

        self.handle = Some(handle);
        self.local_addr = Some(addr);
        info!(target: "feedback", "listening for DAW feedback on {}", addr);
        Ok(addr)
    }

    /// Signal the receive loop and join it. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: "feedback", "receive thread panicked");
            }
            info!(target: "feedback", "feedback listener stopped");
        }
        self.local_addr = None;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.handle.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for FeedbackRouter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: UdpSocket, routes: &RouteTable, store: &DawStateStore, running: &AtomicBool) {
    let mut buf = [0u8; rosc::decoder::MTU];
    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((n, _)) => match rosc::decoder::decode_udp(&buf[..n]) {
                Ok((_, packet)) => routes.route_packet(&packet, store),
                Err(e) => debug!(target: "feedback", "undecodable datagram: {}", e),
            },
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                warn!(target: "feedback", "receive error: {}", e);
                thread::sleep(RECV_TIMEOUT);
            }
        }
    }
}
