//! # RoomKit Core
//!
//! Session-level building blocks shared by every RoomKit crate: the error type,
//! the fire-and-forget event bus, and the reconnection coordinator that keeps
//! room state consistent across transport interruptions.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod reconnect;

// Re-export main types
pub use error::RoomKitError;
pub use event::{EventBus, EventStream};
pub use reconnect::{
    ConnectionState, DisconnectReason, ReconnectCoordinator, ReconnectPolicy, ResumeError,
    SessionTransport, StateReplayer,
};
