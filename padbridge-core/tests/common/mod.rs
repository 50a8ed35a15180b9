#![allow(dead_code)]
//! Test harness utilities for padbridge-core integration tests.

use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use padbridge_core::{CommandClient, DawStateStore, EventBus, FeedbackRouter};
use padbridge_types::{Event, EventKind, StateChange};
use rosc::{OscMessage, OscPacket, OscType};

/// Stand-in for the DAW: receives commands, sends feedback.
pub struct FakeDaw {
    socket: UdpSocket,
    feedback_port: u16,
}

impl FakeDaw {
    pub fn new(feedback_port: u16) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        Self {
            socket,
            feedback_port,
        }
    }

    /// A command client aimed at this fake.
    pub fn commands(&self) -> CommandClient {
        CommandClient::new("127.0.0.1", self.socket.local_addr().unwrap().port())
    }

    /// Next command message, or None after the read timeout.
    pub fn recv(&self) -> Option<OscMessage> {
        let mut buf = [0u8; rosc::decoder::MTU];
        let n = self.socket.recv(&mut buf).ok()?;
        match rosc::decoder::decode_udp(&buf[..n]) {
            Ok((_, OscPacket::Message(msg))) => Some(msg),
            other => panic!("Expected message, got {:?}", other),
        }
    }

    pub fn feedback(&self, addr: &str, args: Vec<OscType>) {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let bytes = rosc::encoder::encode(&packet).unwrap();
        self.socket
            .send_to(&bytes, ("127.0.0.1", self.feedback_port))
            .unwrap();
    }

    /// Send a received command straight back as feedback.
    pub fn echo(&self, msg: OscMessage) {
        self.feedback(&msg.addr, msg.args);
    }
}

/// Store, bus and a running feedback router on an ephemeral port.
pub struct Mirror {
    pub bus: EventBus,
    pub store: Arc<DawStateStore>,
    pub router: FeedbackRouter,
    pub changes: Arc<Mutex<Vec<StateChange>>>,
}

impl Mirror {
    pub fn start() -> Self {
        let bus = EventBus::new();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        bus.subscribe(EventKind::StateChanged, move |event| {
            if let Event::StateChanged(change) = event {
                sink.lock().unwrap().push(*change);
            }
            Ok(())
        });
        let store = Arc::new(DawStateStore::new(bus.clone()));
        let mut router = FeedbackRouter::new(0, Arc::clone(&store));
        router.start().unwrap();
        Self {
            bus,
            store,
            router,
            changes,
        }
    }

    pub fn port(&self) -> u16 {
        self.router.local_addr().unwrap().port()
    }

    pub fn changes(&self) -> Vec<StateChange> {
        self.changes.lock().unwrap().clone()
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
