//! In-process capture provider for tests and demos

use super::CaptureProvider;
use crate::error::{MediaError, MediaResult};
use crate::options::CaptureOptions;
use crate::stream::{MediaStream, MediaStreamTrack};
use crate::tracks::TrackKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted outcome for the next acquisition
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Return this error
    Error(MediaError),
    /// Return a stream with no tracks
    EmptyStream,
    /// Return a stream of the opposite kind
    WrongKind,
}

/// Capture provider producing a fresh synthetic stream per acquisition
#[derive(Debug, Default)]
pub struct MockCaptureProvider {
    failures: Mutex<VecDeque<MockFailure>>,
    fail_release: AtomicBool,
    acquire_delay: Option<Duration>,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    acquired_options: Mutex<Vec<CaptureOptions>>,
    released_stream_ids: Mutex<Vec<String>>,
    released_track_ids: Mutex<Vec<String>>,
}

impl MockCaptureProvider {
    /// Create a provider that always succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every acquisition
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = Some(delay);
        self
    }

    /// Queue an outcome for the next acquisition
    pub fn fail_next(&self, failure: MockFailure) {
        self.failures.lock().push_back(failure);
    }

    /// Make every release report an error (the stream is still counted)
    pub fn fail_releases(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    /// Number of acquisitions attempted
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Number of releases requested
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Options passed to each acquisition, in order
    pub fn acquired_options(&self) -> Vec<CaptureOptions> {
        self.acquired_options.lock().clone()
    }

    /// IDs of streams passed to release, in order
    pub fn released_stream_ids(&self) -> Vec<String> {
        self.released_stream_ids.lock().clone()
    }

    /// IDs of the individual tracks torn down by releases, in order
    pub fn released_track_ids(&self) -> Vec<String> {
        self.released_track_ids.lock().clone()
    }
}

#[async_trait]
impl CaptureProvider for MockCaptureProvider {
    async fn acquire(&self, options: &CaptureOptions) -> MediaResult<MediaStream> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.acquired_options.lock().push(options.clone());

        if let Some(delay) = self.acquire_delay {
            tokio::time::sleep(delay).await;
        }

        let label = options.variant().to_string();
        let failure = self.failures.lock().pop_front();
        let kinds = match failure {
            Some(MockFailure::Error(e)) => return Err(e),
            Some(MockFailure::EmptyStream) => Vec::new(),
            Some(MockFailure::WrongKind) => options
                .expected_kinds()
                .into_iter()
                .map(|kind| match kind {
                    TrackKind::Audio => TrackKind::Video,
                    TrackKind::Video => TrackKind::Audio,
                })
                .collect(),
            None => options.expected_kinds(),
        };

        let tracks = kinds
            .into_iter()
            .map(|kind| MediaStreamTrack::new(kind, format!("mock {} {}", label, kind)))
            .collect();
        Ok(MediaStream::new(tracks))
    }

    async fn release(&self, stream: &MediaStream) -> MediaResult<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.released_stream_ids
            .lock()
            .push(stream.id().to_string());
        self.released_track_ids
            .lock()
            .extend(stream.tracks().iter().map(|t| t.id().to_string()));

        if self.fail_release.load(Ordering::SeqCst) {
            return Err(MediaError::ResourceRelease {
                resource: format!("stream {}", stream.id()),
                reason: "device busy".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::acquire_validated;

    #[tokio::test]
    async fn test_fresh_stream_per_acquisition() {
        let provider = MockCaptureProvider::new();
        let first = provider.acquire(&CaptureOptions::camera()).await.unwrap();
        let second = provider.acquire(&CaptureOptions::camera()).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(provider.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_wrong_kind_is_rejected_and_released() {
        let provider = MockCaptureProvider::new();
        provider.fail_next(MockFailure::WrongKind);

        let err = acquire_validated(&provider, &CaptureOptions::microphone())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::CreationFailure { .. }));
        assert_eq!(provider.releases(), 1);
    }

    #[tokio::test]
    async fn test_empty_stream_is_rejected() {
        let provider = MockCaptureProvider::new();
        provider.fail_next(MockFailure::EmptyStream);

        let err = acquire_validated(&provider, &CaptureOptions::camera())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MediaError::CreationFailure {
                kind: TrackKind::Video,
                ..
            }
        ));
    }
}
