//! Track processor pipeline
//!
//! A processor is a transform bound to one track at a time. The track owns it
//! while attached, initializes it on the current raw stream, and destroys it
//! before the stream goes away. When the processor exposes a processed
//! stream, that stream becomes the track's outgoing media.

use crate::error::MediaResult;
use crate::stream::{MediaStream, MediaStreamTrack};
use crate::tracks::TrackKind;
use async_trait::async_trait;
use std::sync::Arc;

/// What a processor is initialized with
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Kind of the owning track
    pub kind: TrackKind,
    /// The track's raw capture stream
    pub stream: MediaStream,
}

impl ProcessorOptions {
    /// Raw track of the owning kind
    pub fn track(&self) -> Option<&Arc<MediaStreamTrack>> {
        self.stream.track_of(self.kind)
    }
}

/// Transform attached to a track
///
/// Implementations must accept `init` again after `destroy`, possibly on a
/// different stream; restarts rely on that.
#[async_trait]
pub trait TrackProcessor: Send + Sync {
    /// Name reported in lifecycle events
    fn name(&self) -> &str;

    /// Bind to the raw stream and start processing
    async fn init(&mut self, options: ProcessorOptions) -> MediaResult<()>;

    /// Stream replacing the raw one at the sender, if the processor produces one
    fn processed_stream(&self) -> Option<MediaStream>;

    /// Stop processing and release everything `init` set up
    async fn destroy(&mut self) -> MediaResult<()>;
}
