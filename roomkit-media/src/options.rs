//! Capture options
//!
//! One variant per capture source. A track keeps the options it was captured
//! with; a restart may only swap them for options of the same variant.

use crate::error::{MediaError, MediaResult};
use crate::tracks::{TrackKind, TrackSource};
use serde::{Deserialize, Serialize};

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoResolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl VideoResolution {
    /// Create a resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 1280x720
    pub const HD: Self = Self::new(1280, 720);
    /// 1920x1080
    pub const FULL_HD: Self = Self::new(1920, 1080);
    /// 640x480
    pub const VGA: Self = Self::new(640, 480);

    /// Width over height
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Preferred camera facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front camera
    User,
    /// Back camera
    Environment,
}

/// Camera capture options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCaptureOptions {
    /// Specific device to open; the platform default when unset
    pub device_id: Option<String>,
    /// Requested resolution
    pub resolution: VideoResolution,
    /// Requested frame rate
    pub frame_rate: f64,
    /// Preferred facing on devices with several cameras
    pub facing_mode: Option<FacingMode>,
}

impl Default for VideoCaptureOptions {
    fn default() -> Self {
        Self {
            device_id: None,
            resolution: VideoResolution::HD,
            frame_rate: 30.0,
            facing_mode: None,
        }
    }
}

/// Microphone capture options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCaptureOptions {
    /// Specific device to open; the platform default when unset
    pub device_id: Option<String>,
    /// Enable acoustic echo cancellation
    pub echo_cancellation: bool,
    /// Enable noise suppression
    pub noise_suppression: bool,
    /// Enable automatic gain control
    pub auto_gain_control: bool,
    /// Number of channels
    pub channel_count: u8,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Default for AudioCaptureOptions {
    fn default() -> Self {
        Self {
            device_id: None,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            channel_count: 1,
            sample_rate: 48_000,
        }
    }
}

/// Whether the capture picker should offer the current browser surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceHint {
    /// Offer it
    Include,
    /// Hide it
    Exclude,
}

/// Screen share capture options.
///
/// The hint flags are advisory; providers ignore the ones their platform
/// cannot honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenShareCaptureOptions {
    /// Capture audio alongside the screen
    pub audio: bool,
    /// Maximum capture resolution
    pub resolution: VideoResolution,
    /// Requested frame rate
    pub frame_rate: f64,
    /// Pre-select the current tab in the picker
    pub prefer_current_tab: bool,
    /// Offer or hide the current tab
    pub self_browser_surface: Option<SurfaceHint>,
    /// Allow switching the shared surface mid-capture
    pub surface_switching: Option<SurfaceHint>,
    /// Offer or hide system audio
    pub system_audio: Option<SurfaceHint>,
    /// Keep captured tab audio from also playing locally
    pub suppress_local_audio_playback: bool,
}

impl Default for ScreenShareCaptureOptions {
    fn default() -> Self {
        Self {
            audio: false,
            resolution: VideoResolution::FULL_HD,
            frame_rate: 15.0,
            prefer_current_tab: false,
            self_browser_surface: None,
            surface_switching: None,
            system_audio: None,
            suppress_local_audio_playback: false,
        }
    }
}

/// Options for an application-provided source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSourceOptions {
    /// Label reported for the source
    pub label: String,
    /// Kinds the source produces
    pub kinds: Vec<TrackKind>,
}

/// Capture variant without its options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureVariant {
    /// Camera
    Camera,
    /// Microphone
    Microphone,
    /// Screen share
    ScreenShare,
    /// Custom source
    Custom,
}

impl std::fmt::Display for CaptureVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureVariant::Camera => write!(f, "camera"),
            CaptureVariant::Microphone => write!(f, "microphone"),
            CaptureVariant::ScreenShare => write!(f, "screen_share"),
            CaptureVariant::Custom => write!(f, "custom"),
        }
    }
}

/// How to (re)acquire a capture stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CaptureOptions {
    /// Camera capture
    Camera(VideoCaptureOptions),
    /// Microphone capture
    Microphone(AudioCaptureOptions),
    /// Screen capture
    ScreenShare(ScreenShareCaptureOptions),
    /// Application-provided source
    Custom(CustomSourceOptions),
}

impl CaptureOptions {
    /// Default camera options
    pub fn camera() -> Self {
        CaptureOptions::Camera(VideoCaptureOptions::default())
    }

    /// Default microphone options
    pub fn microphone() -> Self {
        CaptureOptions::Microphone(AudioCaptureOptions::default())
    }

    /// Default screen share options
    pub fn screen_share() -> Self {
        CaptureOptions::ScreenShare(ScreenShareCaptureOptions::default())
    }

    /// Variant tag
    pub fn variant(&self) -> CaptureVariant {
        match self {
            CaptureOptions::Camera(_) => CaptureVariant::Camera,
            CaptureOptions::Microphone(_) => CaptureVariant::Microphone,
            CaptureOptions::ScreenShare(_) => CaptureVariant::ScreenShare,
            CaptureOptions::Custom(_) => CaptureVariant::Custom,
        }
    }

    /// Media kinds a stream acquired with these options must contain
    pub fn expected_kinds(&self) -> Vec<TrackKind> {
        match self {
            CaptureOptions::Camera(_) => vec![TrackKind::Video],
            CaptureOptions::Microphone(_) => vec![TrackKind::Audio],
            CaptureOptions::ScreenShare(opts) if opts.audio => {
                vec![TrackKind::Video, TrackKind::Audio]
            }
            CaptureOptions::ScreenShare(_) => vec![TrackKind::Video],
            CaptureOptions::Custom(opts) => {
                let mut kinds = Vec::new();
                for kind in &opts.kinds {
                    if !kinds.contains(kind) {
                        kinds.push(*kind);
                    }
                }
                kinds
            }
        }
    }

    /// Source reported for a track of the given kind captured with these options
    pub fn source_for(&self, kind: TrackKind) -> TrackSource {
        match (self, kind) {
            (CaptureOptions::Camera(_), _) => TrackSource::Camera,
            (CaptureOptions::Microphone(_), _) => TrackSource::Microphone,
            (CaptureOptions::ScreenShare(_), TrackKind::Video) => TrackSource::ScreenShare,
            (CaptureOptions::ScreenShare(_), TrackKind::Audio) => TrackSource::ScreenShareAudio,
            (CaptureOptions::Custom(_), _) => TrackSource::Custom,
        }
    }

    /// Narrow the options to what re-acquiring a single track of `kind` needs
    pub fn scoped_to(&self, kind: TrackKind) -> CaptureOptions {
        match self {
            CaptureOptions::ScreenShare(opts) if kind == TrackKind::Video => {
                CaptureOptions::ScreenShare(ScreenShareCaptureOptions {
                    audio: false,
                    ..opts.clone()
                })
            }
            CaptureOptions::Custom(opts) => CaptureOptions::Custom(CustomSourceOptions {
                label: opts.label.clone(),
                kinds: vec![kind],
            }),
            other => other.clone(),
        }
    }

    /// Reject options of another variant
    pub fn ensure_same_variant(&self, other: &CaptureOptions) -> MediaResult<()> {
        if self.variant() == other.variant() {
            Ok(())
        } else {
            Err(MediaError::Usage {
                message: format!(
                    "cannot restart a {} track with {} options",
                    self.variant(),
                    other.variant()
                ),
            })
        }
    }

    /// Validate option values
    pub fn validate(&self) -> MediaResult<()> {
        match self {
            CaptureOptions::Camera(opts) => {
                validate_video(&opts.resolution, opts.frame_rate)?;
            }
            CaptureOptions::Microphone(opts) => {
                if opts.channel_count == 0 {
                    return Err(MediaError::Usage {
                        message: "Channel count must be > 0".to_string(),
                    });
                }
                if opts.sample_rate == 0 {
                    return Err(MediaError::Usage {
                        message: "Sample rate must be > 0".to_string(),
                    });
                }
            }
            CaptureOptions::ScreenShare(opts) => {
                validate_video(&opts.resolution, opts.frame_rate)?;
            }
            CaptureOptions::Custom(opts) => {
                if opts.kinds.is_empty() {
                    return Err(MediaError::Usage {
                        message: "Custom source must produce at least one kind".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn validate_video(resolution: &VideoResolution, frame_rate: f64) -> MediaResult<()> {
    if resolution.width == 0 || resolution.height == 0 {
        return Err(MediaError::Usage {
            message: "Invalid resolution".to_string(),
        });
    }

    if frame_rate <= 0.0 || frame_rate > 120.0 {
        return Err(MediaError::Usage {
            message: "Invalid framerate".to_string(),
        });
    }

    Ok(())
}
