//! Signaling protocol messages

use crate::error::SignalError;
use roomkit_media::{TrackKind, TrackSource};
use serde::{Deserialize, Serialize};

/// Description of a published track as carried by signaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Track ID
    pub track_id: String,
    /// Media kind
    pub kind: TrackKind,
    /// Capture source
    pub source: TrackSource,
    /// Whether the publisher has the track muted
    pub muted: bool,
}

/// Requests sent from the client to the signaling server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalRequest {
    /// Announce a local track
    AddTrack {
        /// Track being published
        track: TrackInfo,
    },
    /// Withdraw a local track
    RemoveTrack {
        /// Track ID
        track_id: String,
    },
    /// Push a local mute change
    MuteTrack {
        /// Track ID
        track_id: String,
        /// New mute state
        muted: bool,
    },
    /// Ask for remote tracks to be delivered or not
    UpdateSubscription {
        /// Publishing participant
        participant_id: String,
        /// Tracks affected
        track_ids: Vec<String>,
        /// Whether to subscribe or unsubscribe
        subscribe: bool,
    },
    /// Leave the room
    Leave,
}

impl SignalRequest {
    /// Short name for logging
    pub fn request_type(&self) -> &'static str {
        match self {
            SignalRequest::AddTrack { .. } => "add_track",
            SignalRequest::RemoveTrack { .. } => "remove_track",
            SignalRequest::MuteTrack { .. } => "mute_track",
            SignalRequest::UpdateSubscription { .. } => "update_subscription",
            SignalRequest::Leave => "leave",
        }
    }

    /// Encode as a JSON frame
    pub fn to_json(&self) -> Result<String, SignalError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON frame
    pub fn from_json(frame: &str) -> Result<Self, SignalError> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Messages pushed by the signaling server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalResponse {
    /// A participant joined the room
    ParticipantJoined {
        /// Participant identity
        participant_id: String,
        /// Optional display name
        name: Option<String>,
    },
    /// A participant left the room
    ParticipantLeft {
        /// Participant identity
        participant_id: String,
    },
    /// A remote participant published a track
    TrackPublished {
        /// Publishing participant
        participant_id: String,
        /// Track details
        track: TrackInfo,
    },
    /// A remote participant withdrew a track
    TrackUnpublished {
        /// Publishing participant
        participant_id: String,
        /// Track ID
        track_id: String,
    },
    /// A remote participant changed a track's mute state
    TrackMuted {
        /// Publishing participant
        participant_id: String,
        /// Track ID
        track_id: String,
        /// New mute state
        muted: bool,
    },
    /// The server is closing the session
    Leave {
        /// Server supplied reason
        reason: String,
        /// Whether the client may try to resume
        can_reconnect: bool,
    },
}

impl SignalResponse {
    /// Short name for logging
    pub fn response_type(&self) -> &'static str {
        match self {
            SignalResponse::ParticipantJoined { .. } => "participant_joined",
            SignalResponse::ParticipantLeft { .. } => "participant_left",
            SignalResponse::TrackPublished { .. } => "track_published",
            SignalResponse::TrackUnpublished { .. } => "track_unpublished",
            SignalResponse::TrackMuted { .. } => "track_muted",
            SignalResponse::Leave { .. } => "leave",
        }
    }

    /// Encode as a JSON frame
    pub fn to_json(&self) -> Result<String, SignalError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON frame
    pub fn from_json(frame: &str) -> Result<Self, SignalError> {
        Ok(serde_json::from_str(frame)?)
    }
}
