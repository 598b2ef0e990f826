//! Configuration types and defaults

use roomkit_core::ReconnectPolicy;

/// Global RoomKit configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Maximum number of concurrent rooms
    pub max_rooms: usize,
    /// Default signaling server URL
    pub default_signaling_url: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            max_rooms: 10,
            default_signaling_url: None,
        }
    }
}

/// Room-specific configuration
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Subscribe to remote tracks as soon as they are announced
    pub auto_subscribe: bool,
    /// Release the microphone when its track is muted
    pub stop_mic_on_mute: bool,
    /// Release the camera when its track is muted
    pub stop_camera_on_mute: bool,
    /// Session recovery policy
    pub reconnect: ReconnectPolicy,
    /// Signaling server URL; falls back to the global default
    pub signaling_url: Option<String>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
            stop_mic_on_mute: false,
            stop_camera_on_mute: true,
            reconnect: ReconnectPolicy::default(),
            signaling_url: None,
        }
    }
}
