//! Participant management and abstractions
//!
//! The local participant owns the registry of published tracks and wires each
//! one to a transport sender and to signaling. Remote participants mirror what
//! signaling announces and carry our subscription wishes for their tracks.

use crate::config::RoomConfig;
use crate::event::RoomEvent;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use roomkit_core::{EventBus, ReconnectCoordinator, RoomKitError};
use roomkit_media::{
    CaptureOptions, CaptureProvider, LocalTrack, RemoteTrack, TrackSender, TrackSignaler,
    TrackSource,
};
use roomkit_signaling::{SignalClient, SignalRequest, TrackInfo};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Creates the transport sender a published track feeds
pub trait SenderFactory: Send + Sync {
    /// Build a sender for `track`
    fn create_sender(&self, track: &LocalTrack) -> Arc<dyn TrackSender>;
}

/// Queues mute pushes from tracks onto the signaling pump
struct MuteForwarder {
    requests: mpsc::UnboundedSender<SignalRequest>,
}

impl TrackSignaler for MuteForwarder {
    fn send_mute(&self, track_id: &str, muted: bool) {
        let request = SignalRequest::MuteTrack {
            track_id: track_id.to_string(),
            muted,
        };
        if self.requests.send(request).is_err() {
            debug!("Signal pump closed, dropping mute push for {}", track_id);
        }
    }
}

/// Deliver queued requests one at a time so they reach signaling in order
fn spawn_signal_pump(signal: Arc<dyn SignalClient>) -> mpsc::UnboundedSender<SignalRequest> {
    let (requests, mut queue) = mpsc::unbounded_channel::<SignalRequest>();
    tokio::spawn(async move {
        while let Some(request) = queue.recv().await {
            let request_type = request.request_type();
            if let Err(e) = signal.send(request).await {
                warn!("⚠️ Failed to push {} to signaling: {}", request_type, e);
            }
        }
    });
    requests
}

/// Local participant representation
#[derive(Clone)]
pub struct LocalParticipant {
    inner: Arc<LocalInner>,
}

struct LocalInner {
    identity: String,
    config: RoomConfig,
    provider: Arc<dyn CaptureProvider>,
    sender_factory: Option<Arc<dyn SenderFactory>>,
    signal: Arc<dyn SignalClient>,
    mute_forwarder: Arc<MuteForwarder>,
    coordinator: Arc<ReconnectCoordinator>,
    published: DashMap<String, LocalTrack>,
    events: EventBus<RoomEvent>,
}

impl LocalParticipant {
    /// Must be called from within a tokio runtime
    pub(crate) fn new(
        identity: String,
        config: RoomConfig,
        provider: Arc<dyn CaptureProvider>,
        sender_factory: Option<Arc<dyn SenderFactory>>,
        signal: Arc<dyn SignalClient>,
        coordinator: Arc<ReconnectCoordinator>,
        events: EventBus<RoomEvent>,
    ) -> Self {
        let mute_forwarder = Arc::new(MuteForwarder {
            requests: spawn_signal_pump(Arc::clone(&signal)),
        });

        Self {
            inner: Arc::new(LocalInner {
                identity,
                config,
                provider,
                sender_factory,
                signal,
                mute_forwarder,
                coordinator,
                published: DashMap::new(),
                events,
            }),
        }
    }

    /// Get participant identity
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    /// Capture a single track; it is not published yet
    pub async fn create_track(&self, options: CaptureOptions) -> Result<LocalTrack, RoomKitError> {
        Ok(LocalTrack::create(options, Arc::clone(&self.inner.provider)).await?)
    }

    /// Capture every track the options produce (screen share with audio yields two)
    pub async fn create_tracks(
        &self,
        options: CaptureOptions,
    ) -> Result<Vec<LocalTrack>, RoomKitError> {
        Ok(LocalTrack::create_tracks(options, Arc::clone(&self.inner.provider)).await?)
    }

    /// Published track by ID
    pub fn track(&self, track_id: &str) -> Option<LocalTrack> {
        self.inner.published.get(track_id).map(|t| t.value().clone())
    }

    /// All published tracks
    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.inner
            .published
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Publish a track to the room.
    ///
    /// Refused unless the session is connected. Publishing a track that is
    /// already published is a no-op returning the existing publication.
    pub async fn publish_track(&self, track: &LocalTrack) -> Result<LocalTrack, RoomKitError> {
        let state = self.inner.coordinator.state();
        if !state.is_usable() {
            return Err(RoomKitError::InvalidState {
                expected: "connected".to_string(),
                actual: state.name().to_string(),
            });
        }

        if let Some(existing) = self.track(track.id()) {
            debug!("Track {} already published, nothing to do", track.id());
            return Ok(existing);
        }
        if track.is_stopped().await {
            return Err(RoomKitError::InvalidState {
                expected: "live track".to_string(),
                actual: "stopped".to_string(),
            });
        }
        if !track.on_publish().await {
            debug!("Track {} is being published elsewhere", track.id());
            return Ok(track.clone());
        }

        info!(
            "📤 Publishing {} track {} as {}",
            track.kind(),
            track.id(),
            self.identity()
        );
        let announce = SignalRequest::AddTrack {
            track: TrackInfo {
                track_id: track.id().to_string(),
                kind: track.kind(),
                source: track.source(),
                muted: track.is_muted().await,
            },
        };
        if let Err(e) = self.inner.signal.send(announce).await {
            track.on_unpublish().await;
            return Err(e.into());
        }

        if let Some(factory) = &self.inner.sender_factory {
            track.attach_sender(factory.create_sender(track)).await;
        }
        let signaler: Arc<dyn TrackSignaler> = self.inner.mute_forwarder.clone();
        track.set_signaler(Some(signaler)).await;

        self.inner
            .published
            .insert(track.id().to_string(), track.clone());
        self.inner.events.emit(RoomEvent::LocalTrackPublished {
            track_id: track.id().to_string(),
            kind: track.kind(),
            source: track.source(),
        });
        Ok(track.clone())
    }

    /// Withdraw a published track, optionally stopping it
    pub async fn unpublish_track(
        &self,
        track_id: &str,
        stop_on_unpublish: bool,
    ) -> Result<LocalTrack, RoomKitError> {
        let (_, track) =
            self.inner
                .published
                .remove(track_id)
                .ok_or_else(|| RoomKitError::TrackNotFound {
                    track_id: track_id.to_string(),
                })?;

        info!("📥 Unpublishing track {}", track_id);
        self.detach(&track).await;

        if self.inner.coordinator.state().is_usable() {
            let request = SignalRequest::RemoveTrack {
                track_id: track_id.to_string(),
            };
            if let Err(e) = self.inner.signal.send(request).await {
                warn!("⚠️ Failed to announce removal of {}: {}", track_id, e);
            }
        }
        if stop_on_unpublish {
            track.stop().await;
        }

        self.inner.events.emit(RoomEvent::LocalTrackUnpublished {
            track_id: track_id.to_string(),
        });
        Ok(track)
    }

    /// Mute or unmute a published track, applying the room's capture policy.
    /// Returns whether the mute state changed.
    pub async fn set_track_muted(&self, track_id: &str, muted: bool) -> Result<bool, RoomKitError> {
        let track = self
            .track(track_id)
            .ok_or_else(|| RoomKitError::TrackNotFound {
                track_id: track_id.to_string(),
            })?;

        let release = self.releases_capture_on_mute(track.source());
        let changed = if muted {
            track.mute(release).await
        } else {
            track.unmute(release).await?
        };

        if changed {
            self.inner.events.emit(RoomEvent::TrackMuteChanged {
                participant_id: self.identity().to_string(),
                track_id: track_id.to_string(),
                muted,
            });
        }
        Ok(changed)
    }

    fn releases_capture_on_mute(&self, source: TrackSource) -> bool {
        match source {
            TrackSource::Camera => self.inner.config.stop_camera_on_mute,
            TrackSource::Microphone => self.inner.config.stop_mic_on_mute,
            _ => false,
        }
    }

    /// Re-assert the mute flag of every published track
    pub(crate) async fn replay_mute_state(&self) -> Result<(), RoomKitError> {
        let mut tracks = self.tracks();
        tracks.sort_by(|a, b| a.id().cmp(b.id()));

        for track in tracks {
            let request = SignalRequest::MuteTrack {
                track_id: track.id().to_string(),
                muted: track.is_muted().await,
            };
            self.inner.signal.send(request).await?;
        }
        Ok(())
    }

    /// Unpublish and stop everything without talking to signaling
    pub(crate) async fn close(&self) {
        let tracks = self.tracks();
        self.inner.published.clear();
        for track in tracks {
            self.detach(&track).await;
            track.stop().await;
        }
    }

    async fn detach(&self, track: &LocalTrack) {
        track.set_signaler(None).await;
        if let Some(sender) = track.detach_sender().await {
            if let Err(e) = sender.replace_track(None).await {
                warn!("⚠️ Failed to clear sender for {}: {}", track.id(), e);
            }
        }
        track.on_unpublish().await;
    }
}

impl fmt::Debug for LocalParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalParticipant")
            .field("identity", &self.inner.identity)
            .field("published", &self.inner.published.len())
            .finish()
    }
}

/// Remote participant representation
#[derive(Clone)]
pub struct RemoteParticipant {
    inner: Arc<RemoteInner>,
}

struct RemoteInner {
    identity: String,
    name: Option<String>,
    joined_at: DateTime<Utc>,
    signal: Arc<dyn SignalClient>,
    tracks: DashMap<String, RemoteTrack>,
    events: EventBus<RoomEvent>,
}

impl RemoteParticipant {
    pub(crate) fn new(
        identity: String,
        name: Option<String>,
        signal: Arc<dyn SignalClient>,
        events: EventBus<RoomEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(RemoteInner {
                identity,
                name,
                joined_at: Utc::now(),
                signal,
                tracks: DashMap::new(),
                events,
            }),
        }
    }

    /// Get participant identity
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    /// Display name, if announced
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// When we first heard of this participant
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.inner.joined_at
    }

    /// Track by ID
    pub fn track(&self, track_id: &str) -> Option<RemoteTrack> {
        self.inner.tracks.get(track_id).map(|t| t.value().clone())
    }

    /// All announced tracks
    pub fn tracks(&self) -> Vec<RemoteTrack> {
        self.inner
            .tracks
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Subscribe to or unsubscribe from one of this participant's tracks.
    /// Returns whether the subscription changed.
    pub async fn set_subscribed(
        &self,
        track_id: &str,
        subscribed: bool,
    ) -> Result<bool, RoomKitError> {
        let track = self
            .track(track_id)
            .ok_or_else(|| RoomKitError::TrackNotFound {
                track_id: track_id.to_string(),
            })?;

        if !track.set_subscribed(subscribed).await {
            return Ok(false);
        }

        self.inner
            .signal
            .send(SignalRequest::UpdateSubscription {
                participant_id: self.identity().to_string(),
                track_ids: vec![track_id.to_string()],
                subscribe: subscribed,
            })
            .await?;

        self.inner.events.emit(RoomEvent::TrackSubscriptionChanged {
            participant_id: self.identity().to_string(),
            track_id: track_id.to_string(),
            subscribed,
        });
        Ok(true)
    }

    /// Register an announced track. Returns `None` if it was already known.
    pub(crate) fn add_track(&self, info: TrackInfo, subscribed: bool) -> Option<RemoteTrack> {
        if self.inner.tracks.contains_key(&info.track_id) {
            debug!("Track {} already announced by {}", info.track_id, self.identity());
            return None;
        }

        let track = RemoteTrack::new(
            info.track_id.clone(),
            self.identity(),
            info.kind,
            info.source,
            info.muted,
            subscribed,
        );
        self.inner.tracks.insert(info.track_id, track.clone());
        Some(track)
    }

    pub(crate) async fn remove_track(&self, track_id: &str) -> Option<RemoteTrack> {
        let (_, track) = self.inner.tracks.remove(track_id)?;
        track.stop().await;
        Some(track)
    }

    pub(crate) async fn set_track_muted(&self, track_id: &str, muted: bool) -> bool {
        match self.track(track_id) {
            Some(track) => track.set_muted(muted).await,
            None => {
                debug!("Mute push for unknown track {}", track_id);
                false
            }
        }
    }

    /// Re-assert which tracks we want delivered
    pub(crate) async fn replay_subscriptions(&self) -> Result<(), RoomKitError> {
        let mut wanted = Vec::new();
        let mut unwanted = Vec::new();
        for track in self.tracks() {
            if track.is_subscribed().await {
                wanted.push(track.id().to_string());
            } else {
                unwanted.push(track.id().to_string());
            }
        }

        for (mut track_ids, subscribe) in [(wanted, true), (unwanted, false)] {
            if track_ids.is_empty() {
                continue;
            }
            track_ids.sort();
            self.inner
                .signal
                .send(SignalRequest::UpdateSubscription {
                    participant_id: self.identity().to_string(),
                    track_ids,
                    subscribe,
                })
                .await?;
        }
        Ok(())
    }

    /// Stop every track
    pub(crate) async fn close(&self) {
        let tracks = self.tracks();
        self.inner.tracks.clear();
        for track in tracks {
            track.stop().await;
        }
    }
}

impl fmt::Debug for RemoteParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteParticipant")
            .field("identity", &self.inner.identity)
            .field("tracks", &self.inner.tracks.len())
            .finish()
    }
}
