//! Signaling errors

use roomkit_core::RoomKitError;
use thiserror::Error;

/// Failures talking to the signaling server
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    /// The outbound channel has no receiver
    #[error("Signaling channel closed")]
    ChannelClosed,

    /// A frame could not be encoded or decoded
    #[error("Signaling serialization failed: {reason}")]
    Serialization {
        /// Serializer message
        reason: String,
    },
}

impl From<serde_json::Error> for SignalError {
    fn from(e: serde_json::Error) -> Self {
        SignalError::Serialization {
            reason: e.to_string(),
        }
    }
}

impl From<SignalError> for RoomKitError {
    fn from(e: SignalError) -> Self {
        RoomKitError::Signaling {
            reason: e.to_string(),
        }
    }
}
