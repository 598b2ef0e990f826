//! Room management and API
//!
//! A [`Room`] ties the local participant, the remote participant registry, the
//! signaling client and the reconnection coordinator together. Connection
//! state changes from the coordinator are forwarded onto the room's event bus
//! so observers see one ordered stream.

use crate::config::RoomConfig;
use crate::event::RoomEvent;
use crate::participant::{LocalParticipant, RemoteParticipant, SenderFactory};
use crate::RoomKit;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use roomkit_core::{
    ConnectionState, DisconnectReason, EventBus, EventStream, ReconnectCoordinator,
    ReconnectPolicy, RoomKitError, SessionTransport, StateReplayer,
};
use roomkit_media::CaptureProvider;
use roomkit_signaling::{SignalClient, SignalRequest, SignalResponse};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Fluent builder for room configuration and connection
pub struct RoomBuilder {
    kit: RoomKit,
    name: String,
    identity: Option<String>,
    config: RoomConfig,
    transport: Option<Arc<dyn SessionTransport>>,
    signal: Option<Arc<dyn SignalClient>>,
    provider: Option<Arc<dyn CaptureProvider>>,
    sender_factory: Option<Arc<dyn SenderFactory>>,
}

impl RoomBuilder {
    pub(crate) fn new(kit: &RoomKit, name: &str) -> Self {
        Self {
            kit: kit.clone(),
            name: name.to_string(),
            identity: None,
            config: RoomConfig::default(),
            transport: None,
            signal: None,
            provider: None,
            sender_factory: None,
        }
    }

    /// Set participant identity (required)
    pub fn participant(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }

    /// Replace the whole room configuration
    pub fn config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the session recovery policy
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    /// Subscribe to remote tracks as they are announced
    pub fn auto_subscribe(mut self, enabled: bool) -> Self {
        self.config.auto_subscribe = enabled;
        self
    }

    /// Set signaling server URL
    pub fn signaling_server(mut self, url: &str) -> Self {
        self.config.signaling_url = Some(url.to_string());
        self
    }

    /// Transport able to resume a dropped session (required)
    pub fn transport(mut self, transport: Arc<dyn SessionTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Signaling client (required)
    pub fn signal_client(mut self, signal: Arc<dyn SignalClient>) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Capture provider for local tracks (required)
    pub fn capture_provider(mut self, provider: Arc<dyn CaptureProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Factory for transport senders of published tracks
    pub fn sender_factory(mut self, factory: Arc<dyn SenderFactory>) -> Self {
        self.sender_factory = Some(factory);
        self
    }

    /// Enter the room over an already established session
    pub async fn connect(self) -> Result<Room, RoomKitError> {
        let identity = self
            .identity
            .ok_or_else(|| RoomKitError::MissingConfiguration {
                field: "participant".to_string(),
            })?;
        let transport = self
            .transport
            .ok_or_else(|| RoomKitError::MissingConfiguration {
                field: "transport".to_string(),
            })?;
        let signal = self
            .signal
            .ok_or_else(|| RoomKitError::MissingConfiguration {
                field: "signal_client".to_string(),
            })?;
        let provider = self
            .provider
            .ok_or_else(|| RoomKitError::MissingConfiguration {
                field: "capture_provider".to_string(),
            })?;

        let mut config = self.config;
        if config.signaling_url.is_none() {
            config.signaling_url = self.kit.config().default_signaling_url.clone();
        }

        self.kit.register_room(&self.name)?;
        info!("🏠 Joining room {} as {}", self.name, identity);

        let room = Room::new(
            self.kit,
            self.name,
            identity,
            config,
            transport,
            signal,
            provider,
            self.sender_factory,
        );
        Ok(room)
    }
}

impl fmt::Debug for RoomBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomBuilder")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish()
    }
}

/// A Room represents a real-time communication session
#[derive(Clone)]
pub struct Room {
    inner: Arc<RoomInner>,
}

struct RoomInner {
    name: String,
    kit: RoomKit,
    config: RoomConfig,
    local: LocalParticipant,
    remotes: DashMap<String, RemoteParticipant>,
    coordinator: Arc<ReconnectCoordinator>,
    transport: Arc<dyn SessionTransport>,
    signal: Arc<dyn SignalClient>,
    events: EventBus<RoomEvent>,
    retry_task: parking_lot::Mutex<Option<JoinHandle<ConnectionState>>>,
    closed: tokio::sync::Mutex<bool>,
}

impl Room {
    #[allow(clippy::too_many_arguments)]
    fn new(
        kit: RoomKit,
        name: String,
        identity: String,
        config: RoomConfig,
        transport: Arc<dyn SessionTransport>,
        signal: Arc<dyn SignalClient>,
        provider: Arc<dyn CaptureProvider>,
        sender_factory: Option<Arc<dyn SenderFactory>>,
    ) -> Self {
        let coordinator = Arc::new(ReconnectCoordinator::new(config.reconnect.clone()));
        let events = EventBus::new();
        let local = LocalParticipant::new(
            identity,
            config.clone(),
            provider,
            sender_factory,
            Arc::clone(&signal),
            Arc::clone(&coordinator),
            events.clone(),
        );

        let inner = Arc::new(RoomInner {
            name,
            kit,
            config,
            local,
            remotes: DashMap::new(),
            coordinator,
            transport,
            signal,
            events,
            retry_task: parking_lot::Mutex::new(None),
            closed: tokio::sync::Mutex::new(false),
        });
        spawn_state_forwarder(&inner);

        Self { inner }
    }

    /// Get room name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Room configuration in effect
    pub fn config(&self) -> &RoomConfig {
        &self.inner.config
    }

    /// The participant representing this client
    pub fn local_participant(&self) -> &LocalParticipant {
        &self.inner.local
    }

    /// Remote participant by identity
    pub fn remote_participant(&self, identity: &str) -> Option<RemoteParticipant> {
        self.inner.remotes.get(identity).map(|p| p.value().clone())
    }

    /// All remote participants, ordered by identity
    pub fn remote_participants(&self) -> Vec<RemoteParticipant> {
        self.inner.remote_list()
    }

    /// Current session state
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.coordinator.state()
    }

    /// Subscribe to room events
    pub fn events(&self) -> EventStream<RoomEvent> {
        self.inner.events.subscribe()
    }

    /// Apply a message pushed by the signaling server
    pub async fn handle_signal(&self, response: SignalResponse) -> Result<(), RoomKitError> {
        if let ConnectionState::Disconnected { reason } = self.inner.coordinator.state() {
            return Err(RoomKitError::Disconnected {
                reason: reason.to_string(),
            });
        }
        debug!(
            "📨 Room {} received {}",
            self.inner.name,
            response.response_type()
        );

        match response {
            SignalResponse::ParticipantJoined {
                participant_id,
                name,
            } => {
                if participant_id != self.inner.local.identity() {
                    self.inner.ensure_participant(&participant_id, name);
                }
            }
            SignalResponse::ParticipantLeft { participant_id } => {
                if let Some((_, participant)) = self.inner.remotes.remove(&participant_id) {
                    info!("👋 Participant {} left room {}", participant_id, self.inner.name);
                    participant.close().await;
                    self.inner
                        .events
                        .emit(RoomEvent::ParticipantLeft { participant_id });
                }
            }
            SignalResponse::TrackPublished {
                participant_id,
                track,
            } => {
                if participant_id == self.inner.local.identity() {
                    return Ok(());
                }
                let participant = self.inner.ensure_participant(&participant_id, None);
                let kind = track.kind;
                if let Some(added) = participant.add_track(track, self.inner.config.auto_subscribe) {
                    self.inner.events.emit(RoomEvent::TrackPublished {
                        participant_id,
                        track_id: added.id().to_string(),
                        kind,
                    });
                }
            }
            SignalResponse::TrackUnpublished {
                participant_id,
                track_id,
            } => {
                let participant = self.inner.known_participant(&participant_id)?;
                if participant.remove_track(&track_id).await.is_some() {
                    self.inner.events.emit(RoomEvent::TrackUnpublished {
                        participant_id,
                        track_id,
                    });
                }
            }
            SignalResponse::TrackMuted {
                participant_id,
                track_id,
                muted,
            } => {
                let participant = self.inner.known_participant(&participant_id)?;
                if participant.set_track_muted(&track_id, muted).await {
                    self.inner.events.emit(RoomEvent::TrackMuteChanged {
                        participant_id,
                        track_id,
                        muted,
                    });
                }
            }
            SignalResponse::Leave {
                reason,
                can_reconnect,
            } => {
                info!(
                    "🚪 Server asked to leave room {}: {} (can reconnect: {})",
                    self.inner.name, reason, can_reconnect
                );
                if can_reconnect {
                    self.handle_connection_lost();
                } else if self
                    .inner
                    .coordinator
                    .disconnect(DisconnectReason::ServerInitiated)
                {
                    self.inner.close().await;
                }
            }
        }
        Ok(())
    }

    /// React to a transport loss signal.
    ///
    /// Starts the retry loop in its own task. Returns false if the session is
    /// not in a state that can start one (already reconnecting or ended).
    pub fn handle_connection_lost(&self) -> bool {
        let state = self.inner.coordinator.state();
        if !state.is_usable() {
            debug!("🔁 Ignoring loss signal while {}", state.name());
            return false;
        }

        let mut retry_task = self.inner.retry_task.lock();
        if retry_task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("🔁 Retry loop already running for room {}", self.inner.name);
            return false;
        }

        warn!("📡 Connection lost in room {}", self.inner.name);
        let room = Arc::clone(&self.inner);
        *retry_task = Some(tokio::spawn(async move {
            room.coordinator
                .handle_connection_lost(room.transport.as_ref(), &*room)
                .await
        }));
        true
    }

    /// Wait for the current retry loop, if any, and return where it settled
    pub async fn wait_for_reconnect(&self) -> Option<ConnectionState> {
        let task = self.inner.retry_task.lock().take()?;
        match task.await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("⚠️ Retry loop for room {} aborted: {}", self.inner.name, e);
                None
            }
        }
    }

    /// Leave the room, stopping every track. Returns false if already left.
    pub async fn disconnect(&self) -> bool {
        if !self
            .inner
            .coordinator
            .disconnect(DisconnectReason::ClientInitiated)
        {
            return false;
        }

        if let Err(e) = self.inner.signal.send(SignalRequest::Leave).await {
            warn!("⚠️ Failed to send leave for room {}: {}", self.inner.name, e);
        }
        self.inner.close().await;
        true
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.inner.name)
            .field("local", &self.inner.local)
            .field("state", &self.inner.coordinator.state().name())
            .finish()
    }
}

impl RoomInner {
    fn remote_list(&self) -> Vec<RemoteParticipant> {
        let mut remotes: Vec<RemoteParticipant> = self
            .remotes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        remotes.sort_by(|a, b| a.identity().cmp(b.identity()));
        remotes
    }

    fn ensure_participant(&self, identity: &str, name: Option<String>) -> RemoteParticipant {
        let participant = match self.remotes.entry(identity.to_string()) {
            Entry::Occupied(existing) => return existing.get().clone(),
            Entry::Vacant(slot) => {
                let participant = RemoteParticipant::new(
                    identity.to_string(),
                    name,
                    Arc::clone(&self.signal),
                    self.events.clone(),
                );
                slot.insert(participant.clone());
                participant
            }
        };

        info!("🙋 Participant {} joined room {}", identity, self.name);
        self.events.emit(RoomEvent::ParticipantJoined {
            participant_id: identity.to_string(),
        });
        participant
    }

    fn known_participant(&self, identity: &str) -> Result<RemoteParticipant, RoomKitError> {
        self.remotes
            .get(identity)
            .map(|p| p.value().clone())
            .ok_or_else(|| RoomKitError::ParticipantNotFound {
                room: self.name.clone(),
                participant: identity.to_string(),
            })
    }

    /// Stop every track and release the room's slot. Runs once.
    async fn close(&self) {
        let mut closed = self.closed.lock().await;
        if *closed {
            return;
        }

        info!("🚪 Closing room {}", self.name);
        self.local.close().await;
        let remotes = self.remote_list();
        self.remotes.clear();
        for remote in remotes {
            remote.close().await;
        }
        self.kit.unregister_room(&self.name);
        *closed = true;
    }
}

#[async_trait]
impl StateReplayer for RoomInner {
    async fn replay(&self) -> Result<(), RoomKitError> {
        info!("🔁 Replaying state of room {}", self.name);
        self.local.replay_mute_state().await?;
        for remote in self.remote_list() {
            remote.replay_subscriptions().await?;
        }
        Ok(())
    }
}

impl Drop for RoomInner {
    fn drop(&mut self) {
        // close() already freed the slot, which may now belong to a newer room
        if !*self.closed.get_mut() {
            self.kit.unregister_room(&self.name);
        }
    }
}

/// Forward coordinator state changes onto the room bus and close the room
/// once the session ends
fn spawn_state_forwarder(inner: &Arc<RoomInner>) {
    let mut states = inner.coordinator.subscribe();
    let events = inner.events.clone();
    let room = Arc::downgrade(inner);

    tokio::spawn(async move {
        while let Some(state) = states.next().await {
            if let Some(event) = RoomEvent::from_connection_state(&state) {
                events.emit(event);
            }
            if matches!(state, ConnectionState::Disconnected { .. }) {
                if let Some(room) = room.upgrade() {
                    room.close().await;
                }
                break;
            }
        }
    });
}
