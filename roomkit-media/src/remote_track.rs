//! Remote track state
//!
//! A remote track is announced by signaling and fed by the transport. Its mute
//! state mirrors what the publisher pushes; its subscription flag is the local
//! participant's wish, which must survive reconnects.

use crate::error::{MediaError, MediaResult};
use crate::stream::MediaStream;
use crate::tracks::{TrackEvent, TrackKind, TrackSource, TrackState};
use chrono::{DateTime, Utc};
use roomkit_core::{EventBus, EventStream};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A track published by another participant
#[derive(Clone)]
pub struct RemoteTrack {
    shared: Arc<Shared>,
}

struct Shared {
    id: String,
    participant: String,
    kind: TrackKind,
    source: TrackSource,
    received_at: DateTime<Utc>,
    events: EventBus<TrackEvent>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: TrackState,
    subscribed: bool,
    stream: Option<MediaStream>,
}

impl RemoteTrack {
    /// Create a remote track from a signaling announcement
    pub fn new(
        id: impl Into<String>,
        participant: impl Into<String>,
        kind: TrackKind,
        source: TrackSource,
        muted: bool,
        subscribed: bool,
    ) -> Self {
        let id = id.into();
        let participant = participant.into();
        info!(
            "📺 Creating remote {} track: {} from {}",
            kind, id, participant
        );

        Self {
            shared: Arc::new(Shared {
                id,
                participant,
                kind,
                source,
                received_at: Utc::now(),
                events: EventBus::new(),
                inner: Mutex::new(Inner {
                    state: if muted {
                        TrackState::Muted
                    } else {
                        TrackState::Live
                    },
                    subscribed,
                    stream: None,
                }),
            }),
        }
    }

    /// Get track ID
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Identity of the publishing participant
    pub fn participant(&self) -> &str {
        &self.shared.participant
    }

    /// Get track kind
    pub fn kind(&self) -> TrackKind {
        self.shared.kind
    }

    /// Get track source
    pub fn source(&self) -> TrackSource {
        self.shared.source
    }

    /// When the announcement was received
    pub fn received_at(&self) -> DateTime<Utc> {
        self.shared.received_at
    }

    /// Observe lifecycle events
    pub fn subscribe(&self) -> EventStream<TrackEvent> {
        self.shared.events.subscribe()
    }

    /// Current lifecycle state
    pub async fn state(&self) -> TrackState {
        self.shared.inner.lock().await.state
    }

    /// Check if the publisher muted the track
    pub async fn is_muted(&self) -> bool {
        self.state().await.is_muted()
    }

    /// Check if we want this track delivered
    pub async fn is_subscribed(&self) -> bool {
        self.shared.inner.lock().await.subscribed
    }

    /// Stream delivered by the transport, if any
    pub async fn stream(&self) -> Option<MediaStream> {
        self.shared.inner.lock().await.stream.clone()
    }

    /// Apply a mute push from the publisher. Returns whether anything changed.
    pub async fn set_muted(&self, muted: bool) -> bool {
        let mut inner = self.shared.inner.lock().await;
        let next = match (inner.state, muted) {
            (TrackState::Live, true) => TrackState::Muted,
            (TrackState::Muted, false) => TrackState::Live,
            _ => return false,
        };

        debug!(
            "🔇 Remote track {} mute state changed to: {}",
            self.id(),
            muted
        );
        inner.state = next;
        let track_id = self.id().to_string();
        self.shared.events.emit(if muted {
            TrackEvent::Muted { track_id }
        } else {
            TrackEvent::Unmuted { track_id }
        });
        true
    }

    /// Record whether we want the track delivered. Returns whether it changed.
    pub async fn set_subscribed(&self, subscribed: bool) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.subscribed == subscribed || inner.state.is_stopped() {
            return false;
        }

        inner.subscribed = subscribed;
        if !subscribed {
            if let Some(stream) = inner.stream.take() {
                stream.stop();
            }
        }
        debug!(
            "Remote track {} subscription set to {}",
            self.id(),
            subscribed
        );
        self.shared.events.emit(TrackEvent::SubscriptionChanged {
            track_id: self.id().to_string(),
            subscribed,
        });
        true
    }

    /// Bind the stream the transport delivered for this track
    pub async fn attach_stream(&self, stream: MediaStream) -> MediaResult<()> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_stopped() {
            return Err(MediaError::InvalidState {
                message: format!("remote track {} is stopped", self.id()),
            });
        }
        if stream.track_of(self.shared.kind).is_none() {
            return Err(MediaError::CreationFailure {
                kind: self.shared.kind,
                reason: format!("delivered stream {} has no {} track", stream.id(), self.kind()),
            });
        }

        if let Some(previous) = inner.stream.replace(stream) {
            previous.stop();
        }
        Ok(())
    }

    /// Stop the track. Returns false if it was already stopped.
    pub async fn stop(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_stopped() {
            return false;
        }

        info!("⏹️ Stopping remote track: {}", self.id());
        if let Some(stream) = inner.stream.take() {
            stream.stop();
        }
        inner.state = TrackState::Stopped;
        self.shared.events.emit(TrackEvent::Ended {
            track_id: self.id().to_string(),
        });
        true
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.shared.id)
            .field("participant", &self.shared.participant)
            .field("kind", &self.shared.kind)
            .field("source", &self.shared.source)
            .finish()
    }
}
