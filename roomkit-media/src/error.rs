//! Media error types and handling
//!
//! Failures fall into two groups. Creation and usage errors leave an operation
//! undone and are returned to the caller. Transport substitution and resource
//! release errors happen on paths that must run to completion, so the track
//! controller logs them and carries on.

use crate::tracks::TrackKind;
use roomkit_core::RoomKitError;
use thiserror::Error;

/// Main error type for media operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    /// Capture produced no stream, or a stream without the requested kind
    #[error("Failed to create {kind} track: {reason}")]
    CreationFailure {
        /// Media kind that was requested
        kind: TrackKind,
        /// Failure reason
        reason: String,
    },

    /// Swapping the outgoing stream at the transport sender failed
    #[error("Transport substitution failed: {reason}")]
    TransportSubstitution {
        /// Failure reason
        reason: String,
    },

    /// Stopping a stream or destroying a processor failed
    #[error("Failed to release {resource}: {reason}")]
    ResourceRelease {
        /// Resource being released
        resource: String,
        /// Failure reason
        reason: String,
    },

    /// Operation was called with arguments it can never accept
    #[error("Usage error: {message}")]
    Usage {
        /// Error message
        message: String,
    },

    /// Processor failed to initialize on the track's stream
    #[error("Processor {name} failed to initialize: {reason}")]
    ProcessorInit {
        /// Processor name
        name: String,
        /// Failure reason
        reason: String,
    },

    /// Invalid state for operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// State error message
        message: String,
    },

    /// Device not found error
    #[error("Device not found: {device_id}")]
    DeviceNotFound {
        /// Device identifier
        device_id: String,
    },

    /// Permission denied error
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::TransportSubstitution { .. } => true,
            MediaError::ResourceRelease { .. } => true,
            MediaError::DeviceNotFound { .. } => true,
            MediaError::CreationFailure { .. } => false,
            MediaError::Usage { .. } => false,
            MediaError::ProcessorInit { .. } => false,
            MediaError::InvalidState { .. } => false,
            MediaError::PermissionDenied { .. } => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::CreationFailure { .. } => ErrorCategory::Capture,
            MediaError::TransportSubstitution { .. } => ErrorCategory::Transport,
            MediaError::ResourceRelease { .. } => ErrorCategory::Cleanup,
            MediaError::Usage { .. } => ErrorCategory::Usage,
            MediaError::ProcessorInit { .. } => ErrorCategory::Processor,
            MediaError::InvalidState { .. } => ErrorCategory::State,
            MediaError::DeviceNotFound { .. } => ErrorCategory::Device,
            MediaError::PermissionDenied { .. } => ErrorCategory::Device,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Stream acquisition errors
    Capture,
    /// Sender-level stream substitution errors
    Transport,
    /// Stream and processor teardown errors
    Cleanup,
    /// Caller errors
    Usage,
    /// Processor lifecycle errors
    Processor,
    /// State management errors
    State,
    /// Device and permission errors
    Device,
}

impl From<MediaError> for RoomKitError {
    fn from(err: MediaError) -> Self {
        RoomKitError::Media {
            reason: err.to_string(),
        }
    }
}
