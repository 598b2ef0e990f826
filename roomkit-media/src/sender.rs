//! Transport and signaling seams used by local tracks

use crate::error::MediaResult;
use crate::stream::MediaStreamTrack;
use async_trait::async_trait;
use std::sync::Arc;

/// Outgoing transport sender for one published track
#[async_trait]
pub trait TrackSender: Send + Sync {
    /// Swap the media the sender transmits; `None` sends nothing
    async fn replace_track(&self, track: Option<Arc<MediaStreamTrack>>) -> MediaResult<()>;
}

/// Fire-and-forget push of local mute state to the remote side
pub trait TrackSignaler: Send + Sync {
    /// Announce the mute state of a published track
    fn send_mute(&self, track_id: &str, muted: bool);
}
