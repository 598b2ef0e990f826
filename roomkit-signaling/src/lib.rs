//! # RoomKit Signaling
//!
//! Signaling message model and the client seam used by rooms to push track
//! announcements, mute changes and subscription updates.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod protocol;

// Re-export main types
pub use client::{ChannelSignalClient, SignalClient, SignalReceiver};
pub use error::SignalError;
pub use protocol::{SignalRequest, SignalResponse, TrackInfo};
