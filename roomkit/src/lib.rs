//! # RoomKit - Real-Time Room Client
//!
//! RoomKit manages the client side of a real-time room: capturing and
//! publishing local audio/video tracks, mirroring remote participants, and
//! keeping the session alive across network interruptions.
//!
//! ## Key Features
//!
//! - **Track lifecycle**: mute with or without releasing devices, device
//!   switching, processor pipelines, idempotent stop
//! - **Session recovery**: exponential backoff with jitter and state replay
//!   before the room reports itself reconnected
//! - **Pluggable seams**: capture, transport, signaling and sender are traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomkit::{CaptureOptions, ChannelSignalClient, MockCaptureProvider, RoomKit};
//! # use roomkit::{ResumeError, SessionTransport};
//! # use std::sync::Arc;
//! # struct Transport;
//! # #[async_trait::async_trait]
//! # impl SessionTransport for Transport {
//! #     async fn resume(&self, _attempt: u32) -> Result<(), ResumeError> { Ok(()) }
//! # }
//!
//! # async fn example() -> Result<(), roomkit::RoomKitError> {
//! let kit = RoomKit::init()?;
//! let (signal, _outbound) = ChannelSignalClient::new();
//!
//! let room = kit
//!     .room("standup")
//!     .participant("alice")
//!     .transport(Arc::new(Transport))
//!     .signal_client(Arc::new(signal))
//!     .capture_provider(Arc::new(MockCaptureProvider::new()))
//!     .connect()
//!     .await?;
//!
//! let local = room.local_participant();
//! let camera = local.create_track(CaptureOptions::camera()).await?;
//! local.publish_track(&camera).await?;
//! local.set_track_muted(camera.id(), true).await?;
//!
//! let mut events = room.events();
//! while let Some(event) = events.next().await {
//!     println!("Room event: {:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use roomkit_core::{
    ConnectionState, DisconnectReason, EventBus, EventStream, ReconnectCoordinator,
    ReconnectPolicy, ResumeError, RoomKitError, SessionTransport, StateReplayer,
};

pub use roomkit_media::{
    AudioCaptureOptions, CaptureOptions, CaptureProvider, LocalTrack, MediaError,
    MediaStream, MediaStreamTrack, MockCaptureProvider, ProcessorOptions, RemoteTrack,
    ScreenShareCaptureOptions, TrackEvent, TrackKind, TrackProcessor, TrackSender,
    TrackSource, TrackState, VideoCaptureOptions,
};

pub use roomkit_signaling::{
    ChannelSignalClient, SignalClient, SignalError, SignalReceiver, SignalRequest,
    SignalResponse, TrackInfo,
};

// Public API modules
pub mod config;
pub mod event;
pub mod participant;
pub mod room;

// Re-export main API types
pub use config::{GlobalConfig, RoomConfig};
pub use event::RoomEvent;
pub use participant::{LocalParticipant, RemoteParticipant, SenderFactory};
pub use room::{Room, RoomBuilder};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug_logging` picks `debug` over
/// `info`. Returns false if a subscriber was already installed.
pub fn init_logging(config: &GlobalConfig) -> bool {
    let default_level = if config.debug_logging { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// Main entry point for RoomKit
#[derive(Debug, Clone)]
pub struct RoomKit {
    inner: Arc<RoomKitInner>,
}

#[derive(Debug)]
struct RoomKitInner {
    config: GlobalConfig,
    active_rooms: DashMap<String, DateTime<Utc>>,
}

impl RoomKit {
    /// Initialize RoomKit with default settings
    ///
    /// # Example
    /// ```rust,no_run
    /// use roomkit::RoomKit;
    ///
    /// let kit = RoomKit::init()?;
    /// # Ok::<(), roomkit::RoomKitError>(())
    /// ```
    pub fn init() -> Result<Self, RoomKitError> {
        Self::init_with(GlobalConfig::default())
    }

    /// Initialize with custom global configuration
    pub fn init_with(config: GlobalConfig) -> Result<Self, RoomKitError> {
        if config.max_rooms == 0 {
            return Err(RoomKitError::Initialization {
                reason: "max_rooms must be at least 1".to_string(),
            });
        }
        if config.debug_logging {
            init_logging(&config);
        }

        Ok(Self {
            inner: Arc::new(RoomKitInner {
                config,
                active_rooms: DashMap::new(),
            }),
        })
    }

    /// Global configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Create a room builder for the given room name
    pub fn room(&self, name: &str) -> RoomBuilder {
        RoomBuilder::new(self, name)
    }

    /// Names of rooms currently connected, oldest first
    pub fn active_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<(String, DateTime<Utc>)> = self
            .inner
            .active_rooms
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        rooms.sort_by_key(|(_, joined)| *joined);
        rooms.into_iter().map(|(name, _)| name).collect()
    }

    pub(crate) fn register_room(&self, name: &str) -> Result<(), RoomKitError> {
        let max_rooms = self.inner.config.max_rooms;
        if self.inner.active_rooms.len() >= max_rooms {
            return Err(RoomKitError::ResourceLimit {
                resource: format!("rooms (max {})", max_rooms),
            });
        }

        match self.inner.active_rooms.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RoomKitError::Connection {
                room: name.to_string(),
                reason: "already connected".to_string(),
                retry_in: None,
            }),
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Ok(())
            }
        }
    }

    pub(crate) fn unregister_room(&self, name: &str) {
        self.inner.active_rooms.remove(name);
    }
}
