//! Clip-engine connectivity for padbridge.
//!
//! Length-prefixed JSON over TCP: unary trigger/fetch calls plus two
//! streaming subscriptions that keep a local clip grid mirror current.

pub mod client;
pub mod framing;
pub mod mirror;
pub mod protocol;

pub use client::{ClipEngineClient, ClipError, ClipTiming};
pub use mirror::ClipMirror;
pub use protocol::{ClipReply, ClipRequest, MatrixUpdate, PlayState, SlotUpdate, StreamKind};
