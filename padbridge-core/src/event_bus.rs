//! In-process publish/subscribe.
//!
//! `publish` snapshots the subscriber list under the lock and invokes the
//! handlers after releasing it, so a handler may subscribe, unsubscribe or
//! publish without deadlocking. A handler that fails or panics is logged and
//! the remaining handlers still run.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use log::{error, warn};
use padbridge_types::{Event, EventKind};

/// Error returned by a subscriber; logged by the bus, never propagated.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

pub type HandlerResult = Result<(), HandlerError>;

type Handler = Arc<dyn Fn(&Event) -> HandlerResult + Send + Sync>;

/// Identity of one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<EventKind, Vec<(SubscriptionId, Handler)>>,
}

/// Cloneable handle to a shared subscriber registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry
            .subscribers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let Some(list) = registry.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        before != list.len()
    }

    /// Deliver `event` to every current subscriber of its kind, in
    /// subscription order.
    pub fn publish(&self, event: Event) {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, Handler)> = {
            let registry = self.lock();
            match registry.subscribers.get(&kind) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for (id, handler) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(target: "event_bus", "handler {:?} for {:?} failed: {}", id, kind, e)
                }
                Err(_) => {
                    error!(target: "event_bus", "handler {:?} for {:?} panicked", id, kind)
                }
            }
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock().subscribers.get(&kind).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padbridge_types::{Button, StateChange};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transport_changed() -> Event {
        Event::StateChanged(StateChange::Transport)
    }

    #[test]
    fn delivers_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(EventKind::StateChanged, move |_| {
                seen.lock().unwrap().push(tag);
                Ok(())
            });
        }

        bus.publish(transport_changed());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn only_matching_kind_is_delivered() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(EventKind::ButtonPressed, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(transport_changed());
        bus.publish(Event::ButtonPressed(Button::Play));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_and_panicking_handlers_do_not_stop_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.subscribe(EventKind::StateChanged, |_| Err("boom".into()));
        bus.subscribe(EventKind::StateChanged, |_| panic!("handler blew up"));
        let c = Arc::clone(&count);
        bus.subscribe(EventKind::StateChanged, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(transport_changed());
        bus.publish(transport_changed());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&count);
        let first = bus.subscribe(EventKind::StateChanged, move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let c2 = Arc::clone(&count);
        bus.subscribe(EventKind::StateChanged, move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });

        assert!(bus.unsubscribe(EventKind::StateChanged, first));
        assert!(!bus.unsubscribe(EventKind::StateChanged, first));
        bus.publish(transport_changed());
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(bus.subscriber_count(EventKind::StateChanged), 1);
    }

    #[test]
    fn handler_may_subscribe_and_publish_reentrantly() {
        let bus = EventBus::new();
        let inner_hits = Arc::new(AtomicUsize::new(0));

        let bus2 = bus.clone();
        let hits = Arc::clone(&inner_hits);
        bus.subscribe(EventKind::ButtonPressed, move |_| {
            let hits = Arc::clone(&hits);
            bus2.subscribe(EventKind::StateChanged, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            bus2.publish(Event::StateChanged(StateChange::Master));
            Ok(())
        });

        bus.publish(Event::ButtonPressed(Button::Shift));
        assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_from_background_thread() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(EventKind::StateChanged, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        bus.publish(transport_changed());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 100);
    }
}
