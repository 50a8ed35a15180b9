//! Startup and teardown of everything the surface talks to.

use std::io::{self, BufRead, IsTerminal};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use padbridge_core::config::Config;
use padbridge_core::{DawStateStore, EventBus, FeedbackRouter, HandlerError};
use padbridge_net::ClipEngineClient;
use padbridge_types::{Event, EventKind};

use crate::driver::{MidiSurface, SurfaceCallbacks, SurfaceError};

/// Background collaborators started before the surface opens.
pub struct Services {
    pub bus: EventBus,
    pub store: Arc<DawStateStore>,
    router: FeedbackRouter,
    pub clips: Option<Arc<ClipEngineClient>>,
}

impl Services {
    /// Start the feedback listener and, when enabled, the clip engine
    /// client. Neither failing is fatal: the surface still drives the DAW.
    pub fn start(config: &Config) -> Self {
        let bus = EventBus::new();
        let store = Arc::new(DawStateStore::new(bus.clone()));

        let mut router = FeedbackRouter::new(config.listen_port(), Arc::clone(&store));
        match router.start() {
            Ok(addr) => info!(target: "feedback", "listening for DAW feedback on {}", addr),
            Err(e) => warn!(
                target: "feedback",
                "feedback listener unavailable on port {}: {}",
                config.listen_port(),
                e
            ),
        }

        let clips = config.clip_engine_enabled().then(|| {
            let client = ClipEngineClient::new(
                config.clip_engine_host(),
                config.clip_engine_port(),
                config.matrix_id(),
                bus.clone(),
            );
            if let Err(e) = client.connect() {
                warn!(target: "clips", "clip engine unavailable, session mode shows empty slots: {}", e);
            }
            Arc::new(client)
        });

        Self {
            bus,
            store,
            router,
            clips,
        }
    }

    /// Forward every bus event into a channel drained by the main loop.
    pub fn forward_events(&self) -> Receiver<Event> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for kind in EventKind::ALL {
            let tx = tx.clone();
            self.bus.subscribe(kind, move |event: &Event| {
                tx.send(event.clone())
                    .map_err(|_| HandlerError::from("event loop has stopped"))
            });
        }
        rx
    }

    /// Open the controller; its input is published on the bus.
    pub fn open_surface(&self, config: &Config) -> Result<MidiSurface, SurfaceError> {
        let bus = self.bus.clone();
        MidiSurface::open(
            config.midi_port(),
            config.use_user_port(),
            SurfaceCallbacks::new(move |event| bus.publish(event.into())),
        )
    }

    pub fn stop(&mut self) {
        self.router.stop();
        if let Some(clips) = &self.clips {
            clips.disconnect();
        }
    }
}

/// Callback that asks the main loop to stop. Safe to call repeatedly and
/// from any thread; requests after the first are dropped.
pub fn shutdown_trigger(shutdown: Sender<()>) -> impl Fn() + Send + 'static {
    move || {
        let _ = shutdown.try_send(());
    }
}

/// Request shutdown on SIGINT, SIGTERM or SIGHUP.
pub fn watch_signals(shutdown: Sender<()>) {
    let trigger = shutdown_trigger(shutdown);
    let installed = ctrlc::set_handler(move || {
        info!(target: "surface", "termination signal received");
        trigger();
    });
    if let Err(e) = installed {
        warn!(target: "surface", "could not install signal handler: {}", e);
    }
}

/// When attached to a terminal, request shutdown on a `q` line or EOF.
pub fn watch_stdin(shutdown: Sender<()>) {
    if !io::stdin().is_terminal() {
        return;
    }
    let trigger = shutdown_trigger(shutdown);
    let spawned = thread::Builder::new()
        .name("stdin-watch".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) if line.trim() == "q" => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            trigger();
        });
    if let Err(e) = spawned {
        warn!(target: "surface", "could not watch stdin: {}", e);
    }
}

