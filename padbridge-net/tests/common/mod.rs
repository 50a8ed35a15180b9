#![allow(dead_code)]
//! Test harness utilities for padbridge-net integration tests.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use padbridge_core::EventBus;
use padbridge_net::framing::{read_message, write_message};
use padbridge_net::protocol::{ClipReply, ClipRequest, MatrixUpdate, SlotUpdate, StreamKind};
use padbridge_net::{ClipEngineClient, ClipTiming};
use padbridge_types::{ClipChange, Event, EventKind};

#[derive(Default)]
struct EngineState {
    snapshot_slots: Vec<SlotUpdate>,
    snapshot_matrix: Vec<MatrixUpdate>,
    snapshots_served: usize,
    requests: Vec<ClipRequest>,
    subscribers: Vec<(StreamKind, BufWriter<TcpStream>)>,
    reject_triggers: Option<String>,
}

/// In-process clip engine speaking the wire protocol on 127.0.0.1.
pub struct FakeEngine {
    addr: SocketAddr,
    state: Arc<Mutex<EngineState>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeEngine {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(EngineState::default()));
        let running = Arc::new(AtomicBool::new(true));

        let (s, r) = (Arc::clone(&state), Arc::clone(&running));
        let handle = thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let s = Arc::clone(&s);
                        thread::spawn(move || serve(stream, s));
                    }
                    Err(_) => thread::sleep(Duration::from_millis(5)),
                }
            }
        });

        Self {
            addr,
            state,
            running,
            handle: Some(handle),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn set_snapshot(&self, slots: Vec<SlotUpdate>, matrix: Vec<MatrixUpdate>) {
        let mut state = self.state.lock().unwrap();
        state.snapshot_slots = slots;
        state.snapshot_matrix = matrix;
    }

    pub fn snapshots_served(&self) -> usize {
        self.state.lock().unwrap().snapshots_served
    }

    pub fn reject_triggers(&self, message: &str) {
        self.state.lock().unwrap().reject_triggers = Some(message.to_string());
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }

    pub fn wait_for_subscribers(&self, expected: usize, timeout: Duration) {
        wait_until(timeout, || self.subscriber_count() >= expected);
        assert!(
            self.subscriber_count() >= expected,
            "Timed out waiting for {} subscribers (have {})",
            expected,
            self.subscriber_count()
        );
    }

    /// Send a batch to every subscriber of `kind`.
    pub fn push(&self, kind: StreamKind, reply: &ClipReply) {
        let mut state = self.state.lock().unwrap();
        for (k, writer) in state.subscribers.iter_mut() {
            if *k == kind {
                let _ = write_message(writer, reply);
            }
        }
    }

    /// Close every subscription from the engine side.
    pub fn drop_subscribers(&self) {
        let mut state = self.state.lock().unwrap();
        for (_, writer) in state.subscribers.drain(..) {
            let _ = writer.get_ref().shutdown(std::net::Shutdown::Both);
        }
    }

    /// Trigger requests received so far.
    pub fn requests(&self) -> Vec<ClipRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.drop_subscribers();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(stream: TcpStream, state: Arc<Mutex<EngineState>>) {
    stream.set_nonblocking(false).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let Ok(write_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    let mut writer = BufWriter::new(write_half);

    let Ok(request) = read_message::<_, ClipRequest>(&mut reader) else {
        return;
    };
    let reply = {
        let mut state = state.lock().unwrap();
        match request {
            ClipRequest::Subscribe { stream, .. } => {
                state.subscribers.push((stream, writer));
                return;
            }
            ClipRequest::GetMatrix { .. } => {
                state.snapshots_served += 1;
                ClipReply::Snapshot {
                    slots: state.snapshot_slots.clone(),
                    matrix: state.snapshot_matrix.clone(),
                }
            }
            other => {
                state.requests.push(other);
                match &state.reject_triggers {
                    Some(message) => ClipReply::Error {
                        message: message.clone(),
                    },
                    None => ClipReply::Ack,
                }
            }
        }
    };
    let _ = write_message(&mut writer, &reply);
}

/// Timing tuned so reconnect tests finish quickly.
pub fn fast_timing() -> ClipTiming {
    ClipTiming {
        probe_timeout: Duration::from_millis(500),
        rpc_timeout: Duration::from_millis(500),
        fetch_timeout: Duration::from_millis(500),
        backoff: Duration::from_millis(50),
        poll_interval: Duration::from_millis(20),
    }
}

/// A connected client plus the clip notifications it published.
pub fn connected_client(engine: &FakeEngine) -> (ClipEngineClient, Arc<Mutex<Vec<ClipChange>>>) {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    bus.subscribe(EventKind::ClipStateChanged, move |event| {
        if let Event::ClipStateChanged(change) = event {
            s.lock().unwrap().push(*change);
        }
        Ok(())
    });

    let client = ClipEngineClient::with_timing("127.0.0.1", engine.port(), 0, bus, fast_timing());
    client.connect().unwrap();
    engine.wait_for_subscribers(2, Duration::from_secs(2));
    (client, seen)
}

/// Poll `cond` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
