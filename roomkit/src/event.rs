//! Event system for room and participant events

use roomkit_core::{ConnectionState, DisconnectReason};
use roomkit_media::{TrackKind, TrackSource};
use std::time::Duration;

/// Room events that can occur during a session
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// A participant joined the room
    ParticipantJoined {
        /// Participant identity
        participant_id: String,
    },
    /// A participant left the room
    ParticipantLeft {
        /// Participant identity
        participant_id: String,
    },
    /// A local track was published
    LocalTrackPublished {
        /// Track ID
        track_id: String,
        /// Media kind
        kind: TrackKind,
        /// Capture source
        source: TrackSource,
    },
    /// A local track was unpublished
    LocalTrackUnpublished {
        /// Track ID
        track_id: String,
    },
    /// A remote participant published a track
    TrackPublished {
        /// Publishing participant
        participant_id: String,
        /// Track ID
        track_id: String,
        /// Media kind
        kind: TrackKind,
    },
    /// A remote participant withdrew a track
    TrackUnpublished {
        /// Publishing participant
        participant_id: String,
        /// Track ID
        track_id: String,
    },
    /// A track's mute state changed
    TrackMuteChanged {
        /// Participant ID that owns the track
        participant_id: String,
        /// Track ID
        track_id: String,
        /// Whether the track is now muted
        muted: bool,
    },
    /// We subscribed to or unsubscribed from a remote track
    TrackSubscriptionChanged {
        /// Publishing participant
        participant_id: String,
        /// Track ID
        track_id: String,
        /// Whether the track is now subscribed
        subscribed: bool,
    },
    /// Room is reconnecting
    Reconnecting {
        /// Attempt number (1-indexed)
        attempt: u32,
        /// Configured attempt budget
        max_attempts: u32,
        /// Backoff before this attempt
        delay: Duration,
    },
    /// Room successfully reconnected and state was replayed
    Reconnected,
    /// Room was disconnected
    Disconnected {
        /// Reason for disconnection
        reason: DisconnectReason,
    },
}

impl RoomEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::ParticipantJoined { .. } => "participant_joined",
            RoomEvent::ParticipantLeft { .. } => "participant_left",
            RoomEvent::LocalTrackPublished { .. } => "local_track_published",
            RoomEvent::LocalTrackUnpublished { .. } => "local_track_unpublished",
            RoomEvent::TrackPublished { .. } => "track_published",
            RoomEvent::TrackUnpublished { .. } => "track_unpublished",
            RoomEvent::TrackMuteChanged { .. } => "track_mute_changed",
            RoomEvent::TrackSubscriptionChanged { .. } => "track_subscription_changed",
            RoomEvent::Reconnecting { .. } => "reconnecting",
            RoomEvent::Reconnected => "reconnected",
            RoomEvent::Disconnected { .. } => "disconnected",
        }
    }

    /// Check if this is a participant-related event
    pub fn is_participant_event(&self) -> bool {
        matches!(
            self,
            RoomEvent::ParticipantJoined { .. } | RoomEvent::ParticipantLeft { .. }
        )
    }

    /// Check if this is a track-related event
    pub fn is_track_event(&self) -> bool {
        matches!(
            self,
            RoomEvent::LocalTrackPublished { .. }
                | RoomEvent::LocalTrackUnpublished { .. }
                | RoomEvent::TrackPublished { .. }
                | RoomEvent::TrackUnpublished { .. }
                | RoomEvent::TrackMuteChanged { .. }
                | RoomEvent::TrackSubscriptionChanged { .. }
        )
    }

    /// Check if this is a connection-related event
    pub fn is_connection_event(&self) -> bool {
        matches!(
            self,
            RoomEvent::Reconnecting { .. } | RoomEvent::Reconnected | RoomEvent::Disconnected { .. }
        )
    }

    /// Translate a session state change into the event observers see.
    ///
    /// `Connected` is the initial state and has no event of its own.
    pub fn from_connection_state(state: &ConnectionState) -> Option<RoomEvent> {
        match state {
            ConnectionState::Connected => None,
            ConnectionState::Reconnecting {
                attempt,
                max_attempts,
                next_delay,
            } => Some(RoomEvent::Reconnecting {
                attempt: *attempt,
                max_attempts: *max_attempts,
                delay: *next_delay,
            }),
            ConnectionState::Reconnected => Some(RoomEvent::Reconnected),
            ConnectionState::Disconnected { reason } => Some(RoomEvent::Disconnected {
                reason: reason.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_translation() {
        assert_eq!(
            RoomEvent::from_connection_state(&ConnectionState::Connected),
            None
        );

        let event = RoomEvent::from_connection_state(&ConnectionState::Reconnecting {
            attempt: 2,
            max_attempts: 5,
            next_delay: Duration::from_millis(600),
        })
        .unwrap();
        assert_eq!(
            event,
            RoomEvent::Reconnecting {
                attempt: 2,
                max_attempts: 5,
                delay: Duration::from_millis(600),
            }
        );
        assert!(event.is_connection_event());
        assert!(!event.is_track_event());
    }

    #[test]
    fn test_event_categories() {
        let muted = RoomEvent::TrackMuteChanged {
            participant_id: "alice".to_string(),
            track_id: "TR_a".to_string(),
            muted: true,
        };
        assert!(muted.is_track_event());
        assert_eq!(muted.event_type(), "track_mute_changed");

        let left = RoomEvent::ParticipantLeft {
            participant_id: "bob".to_string(),
        };
        assert!(left.is_participant_event());
        assert!(!left.is_connection_event());
    }
}
