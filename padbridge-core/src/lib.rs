//! State synchronization engine between the surface and the DAW.
//!
//! - `event_bus`: in-process publish/subscribe
//! - `store`: thread-safe mirror of DAW state
//! - `feedback`: OSC listener that routes DAW feedback into the mirror
//! - `command`: outbound OSC commands to the DAW
//! - `config`: layered configuration

pub mod command;
pub mod config;
pub mod event_bus;
pub mod feedback;
pub mod store;

pub use command::CommandClient;
pub use event_bus::{EventBus, HandlerError, SubscriptionId};
pub use feedback::FeedbackRouter;
pub use store::DawStateStore;
