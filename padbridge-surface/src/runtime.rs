//! Main-thread event loop.
//!
//! Bus events arrive on an inbox channel and are handled one at a time.
//! The active mode is rendered at most once per frame, and only when an
//! event was handled or the DAW mirror changed since the last frame.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use log::info;
use padbridge_types::Event;

use crate::dispatch::ModeDispatcher;

pub struct SurfaceRuntime {
    dispatcher: ModeDispatcher,
    inbox: Receiver<Event>,
    shutdown: Receiver<()>,
    frame: Duration,
    render_needed: bool,
    last_render_time: Instant,
}

impl SurfaceRuntime {
    pub fn new(
        dispatcher: ModeDispatcher,
        inbox: Receiver<Event>,
        shutdown: Receiver<()>,
        fps: u32,
    ) -> Self {
        let frame = Duration::from_secs(1) / fps.max(1);
        Self {
            dispatcher,
            inbox,
            shutdown,
            frame,
            render_needed: true,
            last_render_time: Instant::now().checked_sub(frame).unwrap_or_else(Instant::now),
        }
    }

    /// Run until shutdown is requested or the inbox closes, then turn the
    /// surface dark.
    pub fn run(&mut self) {
        self.dispatcher.start();
        loop {
            let remaining = self.frame.saturating_sub(self.last_render_time.elapsed());
            crossbeam_channel::select! {
                recv(self.inbox) -> result => {
                    match result {
                        Ok(event) => {
                            self.dispatcher.handle(event);
                            self.render_needed = true;
                        }
                        Err(_) => break, // Disconnected
                    }
                }
                recv(self.shutdown) -> _ => {
                    info!(target: "surface", "shutdown requested");
                    break;
                }
                // Timeout - render if a frame is due
                default(remaining) => {}
            }
            self.maybe_render();
        }
        self.dispatcher.shutdown();
    }

    fn maybe_render(&mut self) {
        if self.last_render_time.elapsed() < self.frame {
            return;
        }
        if self.dispatcher.store().consume_dirty() {
            self.render_needed = true;
        }
        if !self.render_needed {
            return;
        }
        self.last_render_time = Instant::now();
        self.render_needed = false;
        self.dispatcher.render();
    }
}
