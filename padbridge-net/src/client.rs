//! Clip-engine client.
//!
//! Keeps a [`ClipMirror`] current through two long-lived subscriptions, one
//! for slot updates and one for matrix updates, each on its own thread. A
//! broken subscription is retried after a backoff until `disconnect`.

use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use padbridge_core::EventBus;
use padbridge_types::{ClipChange, Event, SlotState};

use crate::framing::{read_message, write_message, FrameReader};
use crate::mirror::ClipMirror;
use crate::protocol::{
    ClipReply, ClipRequest, ColumnAction, MatrixAction, RowAction, SlotAction, StreamKind,
};

#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("clip engine I/O: {0}")]
    Io(#[from] io::Error),
    #[error("clip engine rejected request: {0}")]
    Rejected(String),
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Timeouts and retry pacing.
#[derive(Debug, Clone)]
pub struct ClipTiming {
    pub probe_timeout: Duration,
    pub rpc_timeout: Duration,
    pub fetch_timeout: Duration,
    pub backoff: Duration,
    /// Read timeout on subscriptions; bounds how long a stop request waits.
    pub poll_interval: Duration,
}

impl Default for ClipTiming {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(3),
            rpc_timeout: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(5),
            backoff: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
        }
    }
}

struct Shared {
    endpoint: String,
    matrix_id: u32,
    timing: ClipTiming,
    mirror: RwLock<ClipMirror>,
    bus: EventBus,
    running: AtomicBool,
}

impl Shared {
    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn resolve(&self) -> io::Result<SocketAddr> {
        self.endpoint.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("could not resolve {}", self.endpoint),
            )
        })
    }

    fn open(&self, timeout: Duration) -> io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&self.resolve()?, timeout)?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// One request, one reply, on a fresh connection.
    fn call(&self, request: &ClipRequest, timeout: Duration) -> Result<ClipReply, ClipError> {
        let stream = self.open(timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut writer = BufWriter::new(stream.try_clone()?);
        write_message(&mut writer, request)?;
        let mut reader = BufReader::new(stream);
        match read_message(&mut reader)? {
            ClipReply::Error { message } => Err(ClipError::Rejected(message)),
            reply => Ok(reply),
        }
    }

    /// Fetch the engine's full state and merge it into the mirror under one
    /// write lock.
    fn load_snapshot(&self) -> Result<(), ClipError> {
        let request = ClipRequest::GetMatrix {
            matrix_id: self.matrix_id,
        };
        let (slots, matrix) = match self.call(&request, self.timing.fetch_timeout)? {
            ClipReply::Snapshot { slots, matrix } => (slots, matrix),
            other => return Err(ClipError::UnexpectedReply(format!("{:?}", other))),
        };

        self.write_mirror().merge_snapshot(&matrix, &slots);
        Ok(())
    }

    fn publish(&self, full_refresh: bool) {
        self.bus
            .publish(Event::ClipStateChanged(ClipChange { full_refresh }));
    }

    fn apply(&self, reply: ClipReply) {
        match reply {
            ClipReply::SlotUpdates { updates } => {
                let changed = self.write_mirror().apply_slot_updates(&updates);
                if changed {
                    self.publish(false);
                }
            }
            ClipReply::MatrixUpdates { updates } => {
                let outcome = self.write_mirror().apply_matrix_updates(&updates);
                if outcome.refetch {
                    info!(target: "clips", "engine reports everything changed, refetching");
                    match self.load_snapshot() {
                        Ok(()) => self.publish(true),
                        Err(e) => {
                            warn!(target: "clips", "refetch failed: {}", e);
                            if outcome.changed {
                                self.publish(false);
                            }
                        }
                    }
                } else if outcome.changed {
                    self.publish(false);
                }
            }
            other => debug!(target: "clips", "ignoring {:?} on subscription", other),
        }
    }

    fn read_mirror(&self) -> RwLockReadGuard<'_, ClipMirror> {
        self.mirror.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_mirror(&self) -> RwLockWriteGuard<'_, ClipMirror> {
        self.mirror.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for the backoff, waking early when stopped.
    fn backoff(&self) {
        let deadline = Instant::now() + self.timing.backoff;
        while self.running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(Duration::from_millis(50)));
        }
    }
}

fn stream_loop(shared: Arc<Shared>, kind: StreamKind) {
    while shared.running() {
        match subscribe(&shared, kind) {
            Ok(()) => break,
            Err(e) => {
                if !shared.running() {
                    break;
                }
                warn!(target: "clips", "{} stream error: {}, reconnecting", kind.name(), e);
            }
        }
        shared.backoff();
    }
    debug!(target: "clips", "{} stream thread exiting", kind.name());
}

/// Consume one subscription until it fails or the client stops.
fn subscribe(shared: &Shared, kind: StreamKind) -> Result<(), ClipError> {
    let stream = shared.open(shared.timing.probe_timeout)?;
    stream.set_read_timeout(Some(shared.timing.poll_interval))?;

    let mut writer = BufWriter::new(stream.try_clone()?);
    write_message(
        &mut writer,
        &ClipRequest::Subscribe {
            stream: kind,
            matrix_id: shared.matrix_id,
        },
    )?;
    debug!(target: "clips", "subscribed to {} updates", kind.name());

    let mut frames = FrameReader::new(stream);
    while shared.running() {
        if let Some(reply) = frames.poll::<ClipReply>()? {
            shared.apply(reply);
        }
    }
    Ok(())
}

pub struct ClipEngineClient {
    shared: Arc<Shared>,
    connected: AtomicBool,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ClipEngineClient {
    pub fn new(host: &str, port: u16, matrix_id: u32, bus: EventBus) -> Self {
        Self::with_timing(host, port, matrix_id, bus, ClipTiming::default())
    }

    pub fn with_timing(
        host: &str,
        port: u16,
        matrix_id: u32,
        bus: EventBus,
        timing: ClipTiming,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint: format!("{}:{}", host, port),
                matrix_id,
                timing,
                mirror: RwLock::new(ClipMirror::new()),
                bus,
                running: AtomicBool::new(false),
            }),
            connected: AtomicBool::new(false),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Probe the engine, fetch the full matrix and start both streams.
    pub fn connect(&self) -> Result<(), ClipError> {
        if self.is_connected() {
            return Ok(());
        }
        drop(self.shared.open(self.shared.timing.probe_timeout)?);
        self.shared.load_snapshot()?;

        self.shared.running.store(true, Ordering::SeqCst);
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        for (kind, name) in [(StreamKind::Slots, "clip-slots"), (StreamKind::Matrix, "clip-matrix")] {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(name.into())
                .spawn(move || stream_loop(shared, kind));
            match handle {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    drop(threads);
                    self.disconnect();
                    return Err(e.into());
                }
            }
        }
        self.connected.store(true, Ordering::SeqCst);
        info!(target: "clips", "connected to clip engine at {}", self.shared.endpoint);
        Ok(())
    }

    /// Stop both streams and wait for their threads. Safe to call repeatedly.
    pub fn disconnect(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        let handles: Vec<_> = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            if handle.join().is_err() {
                warn!(target: "clips", "stream thread panicked");
            }
        }
        info!(target: "clips", "clip engine client stopped");
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    // --- Queries ---

    pub fn get_slot_state(&self, col: u32, row: u32) -> SlotState {
        self.shared.read_mirror().slot_state(col, row)
    }

    /// `grid[row][col]` with stopped-but-empty slots shown as empty.
    pub fn get_grid_state(
        &self,
        cols: u32,
        rows: u32,
        col_offset: u32,
        row_offset: u32,
    ) -> Vec<Vec<SlotState>> {
        self.shared
            .read_mirror()
            .grid(cols, rows, col_offset, row_offset)
    }

    pub fn column_name(&self, col: u32) -> String {
        self.shared.read_mirror().column_name(col)
    }

    pub fn num_columns(&self) -> u32 {
        self.shared.read_mirror().num_columns()
    }

    pub fn num_rows(&self) -> u32 {
        self.shared.read_mirror().num_rows()
    }

    pub fn tempo(&self) -> f64 {
        self.shared.read_mirror().tempo()
    }

    // --- Triggers ---

    pub fn trigger_slot(&self, col: u32, row: u32) {
        self.trigger(
            "trigger slot",
            ClipRequest::TriggerSlot {
                matrix_id: self.shared.matrix_id,
                column: col,
                row,
                action: SlotAction::Trigger,
            },
        );
    }

    pub fn stop_slot(&self, col: u32, row: u32) {
        self.trigger(
            "stop slot",
            ClipRequest::TriggerSlot {
                matrix_id: self.shared.matrix_id,
                column: col,
                row,
                action: SlotAction::Stop,
            },
        );
    }

    pub fn trigger_scene(&self, row: u32) {
        self.trigger(
            "trigger scene",
            ClipRequest::TriggerRow {
                matrix_id: self.shared.matrix_id,
                row,
                action: RowAction::Play,
            },
        );
    }

    pub fn stop_column(&self, col: u32) {
        self.trigger(
            "stop column",
            ClipRequest::TriggerColumn {
                matrix_id: self.shared.matrix_id,
                column: col,
                action: ColumnAction::Stop,
            },
        );
    }

    pub fn stop_all(&self) {
        self.trigger(
            "stop all",
            ClipRequest::TriggerMatrix {
                matrix_id: self.shared.matrix_id,
                action: MatrixAction::StopAllClips,
            },
        );
    }

    fn trigger(&self, what: &str, request: ClipRequest) {
        if !self.is_connected() {
            debug!(target: "clips", "not connected, skipping {}", what);
            return;
        }
        match self.shared.call(&request, self.shared.timing.rpc_timeout) {
            Ok(_) => info!(target: "clips", "{}: {:?}", what, request),
            Err(e) => warn!(target: "clips", "{} failed: {}", what, e),
        }
    }
}

impl Drop for ClipEngineClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
