//! Error types for RoomKit

use std::time::Duration;
use thiserror::Error;

/// Main error type for room-level operations
#[derive(Error, Debug)]
pub enum RoomKitError {
    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Connection error
    #[error("Connection failed for room {room}: {reason}")]
    Connection {
        /// Room where connection failed
        room: String,
        /// Reason for connection failure
        reason: String,
        /// Suggested retry delay
        retry_in: Option<Duration>,
    },

    /// The session has reached its terminal disconnected state
    #[error("Session disconnected: {reason}")]
    Disconnected {
        /// Why the session ended
        reason: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Signaling channel error
    #[error("Signaling error: {reason}")]
    Signaling {
        /// Reason for signaling failure
        reason: String,
    },

    /// Media pipeline error
    #[error("Media error: {reason}")]
    Media {
        /// Reason for media failure
        reason: String,
    },

    /// Track not found
    #[error("Track not found: {track_id}")]
    TrackNotFound {
        /// Track ID
        track_id: String,
    },

    /// Participant not found
    #[error("Participant {participant} not found in room {room}")]
    ParticipantNotFound {
        /// Room name
        room: String,
        /// Participant identity that was not found
        participant: String,
    },

    /// Resource limit exceeded
    #[error("Resource limit exceeded: {resource}")]
    ResourceLimit {
        /// Resource that exceeded limit
        resource: String,
    },
}

impl RoomKitError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            RoomKitError::Initialization { .. } => "INITIALIZATION_FAILED",
            RoomKitError::MissingConfiguration { .. } => "MISSING_CONFIGURATION",
            RoomKitError::Connection { .. } => "CONNECTION_FAILED",
            RoomKitError::Disconnected { .. } => "DISCONNECTED",
            RoomKitError::InvalidState { .. } => "INVALID_STATE",
            RoomKitError::Signaling { .. } => "SIGNALING_ERROR",
            RoomKitError::Media { .. } => "MEDIA_ERROR",
            RoomKitError::TrackNotFound { .. } => "TRACK_NOT_FOUND",
            RoomKitError::ParticipantNotFound { .. } => "PARTICIPANT_NOT_FOUND",
            RoomKitError::ResourceLimit { .. } => "RESOURCE_LIMIT_EXCEEDED",
        }
    }

    /// Check whether retrying the operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            RoomKitError::Connection { .. } => true,
            RoomKitError::Signaling { .. } => true,
            RoomKitError::ResourceLimit { .. } => true,
            RoomKitError::Initialization { .. }
            | RoomKitError::MissingConfiguration { .. }
            | RoomKitError::Disconnected { .. }
            | RoomKitError::InvalidState { .. }
            | RoomKitError::Media { .. }
            | RoomKitError::TrackNotFound { .. }
            | RoomKitError::ParticipantNotFound { .. } => false,
        }
    }

    /// Suggested delay before retrying, if any
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            RoomKitError::Connection { retry_in, .. } => *retry_in,
            RoomKitError::Signaling { .. } => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = RoomKitError::Disconnected {
            reason: "max attempts exceeded".to_string(),
        };
        assert_eq!(err.error_code(), "DISCONNECTED");
        assert!(!err.is_retryable());

        let err = RoomKitError::Connection {
            room: "lobby".to_string(),
            reason: "timeout".to_string(),
            retry_in: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.error_code(), "CONNECTION_FAILED");
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_error_display() {
        let err = RoomKitError::InvalidState {
            expected: "connected".to_string(),
            actual: "disconnected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state: expected connected, got disconnected"
        );
    }
}
