//! Test doubles: a recording surface and a rig with a live store, an OSC
//! capture socket standing in for the DAW, and the mode context plumbing.

use std::cell::RefCell;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use padbridge_core::{CommandClient, DawStateStore, EventBus};
use padbridge_types::{Button, Color};
use rosc::{OscMessage, OscPacket, OscType};

use crate::dispatch::ModeEnv;
use crate::display::Screen;
use crate::driver::SurfaceOutput;
use crate::modes::ModeContext;
use crate::output::{OutputSink, Surface};
use crate::scales::ScaleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Button(Button, Color),
    Pad(u8, u8, Color),
}

#[derive(Default)]
struct Recorded {
    writes: Vec<Write>,
    screens: Vec<Screen>,
    cleared: bool,
}

/// Hardware stand-in that records every write. Clones share one log.
#[derive(Clone, Default)]
pub struct RecordingOutput {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingOutput {
    pub fn writes(&self) -> Vec<Write> {
        self.inner.lock().unwrap().writes.clone()
    }

    /// Return the writes so far and forget them.
    pub fn take(&self) -> Vec<Write> {
        std::mem::take(&mut self.inner.lock().unwrap().writes)
    }

    pub fn screens(&self) -> Vec<Screen> {
        self.inner.lock().unwrap().screens.clone()
    }

    pub fn cleared(&self) -> bool {
        self.inner.lock().unwrap().cleared
    }
}

impl OutputSink for RecordingOutput {
    fn write_button(&mut self, button: Button, color: Color) {
        self.inner.lock().unwrap().writes.push(Write::Button(button, color));
    }

    fn write_pad(&mut self, row: u8, col: u8, color: Color) {
        self.inner.lock().unwrap().writes.push(Write::Pad(row, col, color));
    }
}

impl SurfaceOutput for RecordingOutput {
    fn write_screen(&mut self, screen: &Screen) {
        self.inner.lock().unwrap().screens.push(screen.clone());
    }

    fn clear(&mut self) {
        self.inner.lock().unwrap().cleared = true;
    }
}

/// UDP socket that receives whatever the command client sends.
pub struct Capture {
    socket: UdpSocket,
    received: RefCell<Vec<OscMessage>>,
}

impl Capture {
    fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        Self {
            socket,
            received: RefCell::new(Vec::new()),
        }
    }

    fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    /// Every message received so far, in arrival order.
    pub fn sent(&self) -> Vec<OscMessage> {
        let mut buf = [0u8; rosc::decoder::MTU];
        while let Ok(n) = self.socket.recv(&mut buf) {
            match rosc::decoder::decode_udp(&buf[..n]) {
                Ok((_, OscPacket::Message(msg))) => self.received.borrow_mut().push(msg),
                Ok((_, other)) => panic!("Expected message, got {:?}", other),
                Err(e) => panic!("undecodable OSC: {:?}", e),
            }
        }
        self.received.borrow().clone()
    }

    pub fn sent_addrs(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.addr).collect()
    }

    /// Float argument of the last message sent to `addr`.
    pub fn sent_float(&self, addr: &str) -> Option<f32> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.addr == addr)
            .and_then(|m| match m.args.first() {
                Some(OscType::Float(v)) => Some(*v),
                _ => None,
            })
    }

    /// Int arguments of every message sent to `addr`.
    pub fn sent_int(&self, addr: &str) -> Vec<i32> {
        self.sent()
            .into_iter()
            .filter(|m| m.addr == addr)
            .filter_map(|m| match m.args.first() {
                Some(OscType::Int(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }
}

pub struct Rig {
    pub env: ModeEnv,
    pub output: RecordingOutput,
    capture: Capture,
}

impl Rig {
    pub fn new() -> Self {
        let capture = Capture::bind();
        let output = RecordingOutput::default();
        let env = ModeEnv {
            store: Arc::new(DawStateStore::new(EventBus::new())),
            commands: CommandClient::new("127.0.0.1", capture.port()),
            clips: None,
            surface: Surface::new(Box::new(output.clone())),
            scale: ScaleState::default(),
        };
        Self {
            env,
            output,
            capture,
        }
    }

    pub fn ctx(&mut self) -> ModeContext<'_> {
        self.env.ctx()
    }

    pub fn into_parts(self) -> (ModeEnv, RecordingOutput, Capture) {
        (self.env, self.output, self.capture)
    }

    pub fn sent_addrs(&self) -> Vec<String> {
        self.capture.sent_addrs()
    }

    pub fn sent_float(&self, addr: &str) -> Option<f32> {
        self.capture.sent_float(addr)
    }

    pub fn sent_int(&self, addr: &str) -> Vec<i32> {
        self.capture.sent_int(addr)
    }
}
