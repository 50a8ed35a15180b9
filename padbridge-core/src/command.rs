//! Outbound OSC to the DAW.
//!
//! Fire-and-forget: every method encodes one or more messages and sends them
//! on a UDP socket. Nothing is acknowledged or retried; the feedback path
//! corrects any drift.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use log::{debug, info, warn};
use rosc::{OscMessage, OscPacket, OscType};

use padbridge_types::{AutomationMode, BANK_SIZE};

pub const VOLUME_STEP: f32 = 0.015;
pub const PAN_STEP: f32 = 0.02;
pub const SEND_STEP: f32 = 0.015;
pub const FX_STEP: f32 = 0.01;

pub const ACTION_UNDO: i32 = 40029;
pub const ACTION_REDO: i32 = 40030;

fn nudged(current: f32, increment: i32, step: f32) -> f32 {
    (current + increment as f32 * step).clamp(0.0, 1.0)
}

/// The socket is bound on IPv4, so an IPv4 address is preferred.
fn resolve(target: &str) -> io::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = target.to_socket_addrs()?.collect();
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("could not resolve {}", target),
            )
        })
}

pub struct CommandClient {
    socket: Option<(UdpSocket, SocketAddr)>,
    target: String,
}

impl CommandClient {
    /// Resolve `host:port` once and bind an ephemeral local socket. A bind
    /// or lookup failure leaves the client disconnected; sends are then
    /// logged and dropped.
    pub fn new(host: &str, port: u16) -> Self {
        let target = format!("{}:{}", host, port);
        let socket = resolve(&target).and_then(|addr| {
            let bind = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            Ok((UdpSocket::bind(bind)?, addr))
        });
        let socket = match socket {
            Ok((socket, addr)) => {
                info!(target: "command", "OSC commands -> {} ({})", target, addr);
                Some((socket, addr))
            }
            Err(e) => {
                warn!(target: "command", "OSC commands to {} disabled: {}", target, e);
                None
            }
        };
        Self { socket, target }
    }

    /// A client that drops everything it is asked to send.
    pub fn disconnected(host: &str, port: u16) -> Self {
        Self {
            socket: None,
            target: format!("{}:{}", host, port),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Address every command is sent to, resolved at construction.
    pub fn target_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().map(|(_, addr)| *addr)
    }

    fn send(&self, addr: &str, args: Vec<OscType>) {
        let Some((socket, target)) = &self.socket else {
            debug!(target: "command", "not connected, dropping {}", addr);
            return;
        };
        debug!(target: "command", "-> {} {:?}", addr, args);
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let buf = match rosc::encoder::encode(&packet) {
            Ok(buf) => buf,
            Err(e) => {
                warn!(target: "command", "failed to encode {}: {}", addr, e);
                return;
            }
        };
        if let Err(e) = socket.send_to(&buf, target) {
            warn!(target: "command", "send {} failed: {}", addr, e);
        }
    }

    fn send_float(&self, addr: &str, value: f32) {
        self.send(addr, vec![OscType::Float(value)]);
    }

    fn send_int(&self, addr: &str, value: i32) {
        self.send(addr, vec![OscType::Int(value)]);
    }

    // --- Transport ---

    pub fn play(&self) {
        self.send_int("/play", 1);
    }

    pub fn stop(&self) {
        self.send_int("/stop", 1);
    }

    pub fn record(&self) {
        self.send_int("/record", 1);
    }

    pub fn pause(&self) {
        self.send_int("/pause", 1);
    }

    pub fn repeat(&self) {
        self.send_int("/repeat", 1);
    }

    /// Toggle the metronome.
    pub fn click(&self) {
        self.send_int("/click", 1);
    }

    pub fn set_tempo(&self, bpm: f32) {
        self.send_float("/tempo/raw", bpm);
    }

    // --- Track volume / pan ---

    pub fn set_track_volume(&self, track: u32, value: f32) {
        self.send_float(&format!("/track/{}/volume", track), value.clamp(0.0, 1.0));
    }

    pub fn set_track_pan(&self, track: u32, value: f32) {
        self.send_float(&format!("/track/{}/pan", track), value.clamp(0.0, 1.0));
    }

    /// Returns the value sent, for optimistic store updates.
    pub fn nudge_track_volume(&self, track: u32, current: f32, increment: i32) -> f32 {
        let value = nudged(current, increment, VOLUME_STEP);
        self.set_track_volume(track, value);
        value
    }

    pub fn nudge_track_pan(&self, track: u32, current: f32, increment: i32) -> f32 {
        let value = nudged(current, increment, PAN_STEP);
        self.set_track_pan(track, value);
        value
    }

    // --- Track flags and selection ---

    pub fn toggle_track_mute(&self, track: u32) {
        self.send(&format!("/track/{}/mute/toggle", track), vec![]);
    }

    pub fn toggle_track_solo(&self, track: u32) {
        self.send(&format!("/track/{}/solo/toggle", track), vec![]);
    }

    pub fn toggle_track_recarm(&self, track: u32) {
        self.send(&format!("/track/{}/recarm/toggle", track), vec![]);
    }

    /// Select `track`, deselecting the other tracks of the bank starting
    /// after `bank_offset`.
    pub fn select_track(&self, track: u32, bank_offset: u32) {
        for other in bank_range(bank_offset).filter(|n| *n != track) {
            self.send_int(&format!("/track/{}/select", other), 0);
        }
        self.send_int(&format!("/track/{}/select", track), 1);
    }

    /// Exclusive select plus record-arm within the bank.
    pub fn select_and_arm_track(&self, track: u32, bank_offset: u32) {
        for other in bank_range(bank_offset).filter(|n| *n != track) {
            self.send_int(&format!("/track/{}/select", other), 0);
            self.send_int(&format!("/track/{}/recarm", other), 0);
        }
        self.send_int(&format!("/track/{}/select", track), 1);
        self.send_int(&format!("/track/{}/recarm", track), 1);
    }

    pub fn solo_reset(&self) {
        self.send("/soloreset", vec![]);
    }

    pub fn set_track_automode(&self, track: u32, mode: AutomationMode) {
        self.send(&format!("/track/{}/automode/{}", track, mode.index()), vec![]);
    }

    // --- Master ---

    pub fn set_master_volume(&self, value: f32) {
        self.send_float("/master/volume", value.clamp(0.0, 1.0));
    }

    pub fn nudge_master_volume(&self, current: f32, increment: i32) -> f32 {
        let value = nudged(current, increment, VOLUME_STEP);
        self.set_master_volume(value);
        value
    }

    // --- Navigation ---

    pub fn next_track_bank(&self) {
        self.send("/device/track/bank/+", vec![]);
    }

    pub fn prev_track_bank(&self) {
        self.send("/device/track/bank/-", vec![]);
    }

    pub fn next_track(&self) {
        self.send("/device/track/+", vec![]);
    }

    pub fn prev_track(&self) {
        self.send("/device/track/-", vec![]);
    }

    // --- Virtual keyboard ---

    pub fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        self.send_int(&format!("/vkb_midi/{}/note/{}", channel, note), i32::from(velocity));
    }

    pub fn note_off(&self, channel: u8, note: u8) {
        self.send_int(&format!("/vkb_midi/{}/note/{}", channel, note), 0);
    }

    pub fn channel_pressure(&self, channel: u8, value: u8) {
        self.send_int(&format!("/vkb_midi/{}/channelpressure", channel), i32::from(value));
    }

    pub fn poly_aftertouch(&self, channel: u8, note: u8, value: u8) {
        self.send_int(
            &format!("/vkb_midi/{}/polyaftertouch/{}", channel, note),
            i32::from(value),
        );
    }

    /// Pitch bend, 0.5 is center.
    pub fn pitch_bend(&self, channel: u8, value: f32) {
        self.send_float(&format!("/vkb_midi/{}/pitch", channel), value.clamp(0.0, 1.0));
    }

    // --- Sends (0-based send index, 1-based on the wire) ---

    pub fn set_send_volume(&self, track: u32, send: usize, value: f32) {
        self.send_float(
            &format!("/track/{}/send/{}/volume", track, send + 1),
            value.clamp(0.0, 1.0),
        );
    }

    pub fn set_send_pan(&self, track: u32, send: usize, value: f32) {
        self.send_float(
            &format!("/track/{}/send/{}/pan", track, send + 1),
            value.clamp(0.0, 1.0),
        );
    }

    pub fn nudge_send_volume(&self, track: u32, send: usize, current: f32, increment: i32) -> f32 {
        let value = nudged(current, increment, SEND_STEP);
        self.set_send_volume(track, send, value);
        value
    }

    // --- FX ---

    pub fn set_fx_param(&self, track: u32, fx: usize, param: usize, value: f32) {
        self.send_float(
            &format!("/track/{}/fx/{}/fxparam/{}/value", track, fx + 1, param + 1),
            value.clamp(0.0, 1.0),
        );
    }

    pub fn nudge_fx_param(
        &self,
        track: u32,
        fx: usize,
        param: usize,
        current: f32,
        increment: i32,
    ) -> f32 {
        let value = nudged(current, increment, FX_STEP);
        self.set_fx_param(track, fx, param, value);
        value
    }

    // --- Actions ---

    pub fn undo(&self) {
        self.trigger_action(ACTION_UNDO);
    }

    pub fn redo(&self) {
        self.trigger_action(ACTION_REDO);
    }

    pub fn trigger_action(&self, id: i32) {
        self.send_int("/action", id);
    }
}

fn bank_range(bank_offset: u32) -> std::ops::RangeInclusive<u32> {
    bank_offset + 1..=bank_offset + BANK_SIZE
}
