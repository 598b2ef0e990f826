//! Raw media stream handles
//!
//! A [`MediaStreamTrack`] is the handle the capture layer hands out for one
//! flow of samples or frames. Its `enabled` flag is the sender-level output
//! gate used by mute; `stop` ends it for good.

use crate::tracks::TrackKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// One captured or received flow of media
#[derive(Debug)]
pub struct MediaStreamTrack {
    id: String,
    kind: TrackKind,
    label: String,
    enabled: AtomicBool,
    ended: AtomicBool,
}

impl MediaStreamTrack {
    /// Create a live, enabled track handle
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            enabled: AtomicBool::new(true),
            ended: AtomicBool::new(false),
        })
    }

    /// Handle identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Media kind
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Device or source label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether output is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Gate output without releasing the source
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether the track still produces media
    pub fn is_live(&self) -> bool {
        !self.ended.load(Ordering::Acquire)
    }

    /// End the track; cannot be undone
    pub fn stop(&self) {
        if !self.ended.swap(true, Ordering::AcqRel) {
            trace!("stream track {} ({}) ended", self.id, self.kind);
        }
        self.enabled.store(false, Ordering::Release);
    }
}

/// A set of track handles produced by one acquisition
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<MediaStreamTrack>>,
}

impl MediaStream {
    /// Wrap track handles into a new stream
    pub fn new(tracks: Vec<Arc<MediaStreamTrack>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    /// Stream identifier; every acquisition yields a fresh one
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All track handles
    pub fn tracks(&self) -> &[Arc<MediaStreamTrack>] {
        &self.tracks
    }

    /// First track of the given kind
    pub fn track_of(&self, kind: TrackKind) -> Option<&Arc<MediaStreamTrack>> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    /// Kinds present in the stream
    pub fn kinds(&self) -> Vec<TrackKind> {
        let mut kinds = Vec::new();
        for track in &self.tracks {
            if !kinds.contains(&track.kind()) {
                kinds.push(track.kind());
            }
        }
        kinds
    }

    /// Whether the stream has no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Whether every track is still live
    pub fn is_live(&self) -> bool {
        !self.tracks.is_empty() && self.tracks.iter().all(|t| t.is_live())
    }

    /// Gate output of every track
    pub fn set_enabled(&self, enabled: bool) {
        for track in &self.tracks {
            track.set_enabled(enabled);
        }
    }

    /// End every track
    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Split into the tracks of `kind` and everything else.
    ///
    /// The returned streams keep the original ID so providers can match them
    /// against what they handed out.
    pub fn split_kind(self, kind: TrackKind) -> (MediaStream, Option<MediaStream>) {
        let (own, rest): (Vec<_>, Vec<_>) = self.tracks.into_iter().partition(|t| t.kind() == kind);
        let rest = if rest.is_empty() {
            None
        } else {
            Some(MediaStream {
                id: self.id.clone(),
                tracks: rest,
            })
        };
        (
            MediaStream {
                id: self.id,
                tracks: own,
            },
            rest,
        )
    }
}
