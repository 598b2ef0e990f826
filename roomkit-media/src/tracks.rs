//! Track kinds, sources, states and lifecycle events

use crate::options::CaptureOptions;
use serde::{Deserialize, Serialize};

/// Track kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Track source enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Camera/webcam video
    Camera,
    /// Microphone audio
    Microphone,
    /// Screen sharing video
    ScreenShare,
    /// Audio captured alongside a screen share
    ScreenShareAudio,
    /// Application-provided source
    Custom,
    /// Other/unknown source
    Unknown,
}

impl std::fmt::Display for TrackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackSource::Camera => write!(f, "camera"),
            TrackSource::Microphone => write!(f, "microphone"),
            TrackSource::ScreenShare => write!(f, "screen_share"),
            TrackSource::ScreenShareAudio => write!(f, "screen_share_audio"),
            TrackSource::Custom => write!(f, "custom"),
            TrackSource::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lifecycle state of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Capturing and sending
    Live,
    /// Output disabled, capture still held
    Muted,
    /// Output disabled and capture released; unmuting reacquires
    MutedReleased,
    /// Not muted but holding no stream because a restart could not acquire one
    Interrupted,
    /// Terminal; no stream or processor is held
    Stopped,
}

impl TrackState {
    /// Whether the mute flag is set
    pub fn is_muted(&self) -> bool {
        matches!(self, TrackState::Muted | TrackState::MutedReleased)
    }

    /// Whether the track has been stopped
    pub fn is_stopped(&self) -> bool {
        matches!(self, TrackState::Stopped)
    }
}

/// Lifecycle event emitted by a track controller
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// Track was muted
    Muted {
        /// Track ID
        track_id: String,
    },
    /// Track was unmuted
    Unmuted {
        /// Track ID
        track_id: String,
    },
    /// Track was stopped
    Ended {
        /// Track ID
        track_id: String,
    },
    /// Track was restarted with the given capture options
    OptionsUpdated {
        /// Track ID
        track_id: String,
        /// Options now in effect
        options: CaptureOptions,
    },
    /// The attached processor changed
    ProcessorUpdated {
        /// Track ID
        track_id: String,
        /// Name of the processor now attached, if any
        processor: Option<String>,
    },
    /// Track was published
    Published {
        /// Track ID
        track_id: String,
    },
    /// Track was unpublished
    Unpublished {
        /// Track ID
        track_id: String,
    },
    /// Local subscription to a remote track changed
    SubscriptionChanged {
        /// Track ID
        track_id: String,
        /// Whether the track is now subscribed
        subscribed: bool,
    },
}

impl TrackEvent {
    /// ID of the track the event belongs to
    pub fn track_id(&self) -> &str {
        match self {
            TrackEvent::Muted { track_id }
            | TrackEvent::Unmuted { track_id }
            | TrackEvent::Ended { track_id }
            | TrackEvent::OptionsUpdated { track_id, .. }
            | TrackEvent::ProcessorUpdated { track_id, .. }
            | TrackEvent::Published { track_id }
            | TrackEvent::Unpublished { track_id }
            | TrackEvent::SubscriptionChanged { track_id, .. } => track_id,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackEvent::Muted { .. } => "muted",
            TrackEvent::Unmuted { .. } => "unmuted",
            TrackEvent::Ended { .. } => "ended",
            TrackEvent::OptionsUpdated { .. } => "options_updated",
            TrackEvent::ProcessorUpdated { .. } => "processor_updated",
            TrackEvent::Published { .. } => "published",
            TrackEvent::Unpublished { .. } => "unpublished",
            TrackEvent::SubscriptionChanged { .. } => "subscription_changed",
        }
    }
}

/// Generate a new track identifier
pub(crate) fn new_track_id() -> String {
    format!("TR_{}", uuid::Uuid::new_v4().simple())
}
