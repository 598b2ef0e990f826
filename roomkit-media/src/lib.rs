//! # RoomKit Media
//!
//! Media track lifecycle for RoomKit: capture options and the capture
//! provider seam, raw stream handles, the processor pipeline, and the
//! local/remote track controllers that keep mute, publish and processor
//! state consistent across device switches and partial failures.

#![warn(clippy::all)]

pub mod capture;
pub mod error;
pub mod local_track;
pub mod options;
pub mod processing;
pub mod remote_track;
pub mod sender;
pub mod stream;
pub mod tracks;

// Re-export main types
pub use capture::{
    acquire_validated, validate_stream, CaptureProvider, MockCaptureProvider, MockFailure,
};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use local_track::LocalTrack;
pub use options::{
    AudioCaptureOptions, CaptureOptions, CaptureVariant, CustomSourceOptions, FacingMode,
    ScreenShareCaptureOptions, SurfaceHint, VideoCaptureOptions, VideoResolution,
};
pub use processing::{ProcessorOptions, TrackProcessor};
pub use remote_track::RemoteTrack;
pub use sender::{TrackSender, TrackSignaler};
pub use stream::{MediaStream, MediaStreamTrack};
pub use tracks::{TrackEvent, TrackKind, TrackSource, TrackState};
