//! Capture provider seam
//!
//! The provider is the only component that touches devices. Everything above
//! it goes through [`acquire_validated`], which refuses streams that do not
//! carry exactly the kinds the options asked for.

pub mod mock;

use crate::error::{MediaError, MediaResult};
use crate::options::CaptureOptions;
use crate::stream::MediaStream;
use crate::tracks::TrackKind;
use async_trait::async_trait;
use tracing::{debug, warn};

pub use mock::{MockCaptureProvider, MockFailure};

/// Acquires and releases raw capture streams
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Open a stream matching `options`
    async fn acquire(&self, options: &CaptureOptions) -> MediaResult<MediaStream>;

    /// Release OS-level resources behind the tracks of `stream`.
    ///
    /// Multi-kind captures are split across tracks, so `stream` may hold only
    /// part of what [`CaptureProvider::acquire`] returned while keeping its ID.
    /// Only the tracks passed in may be torn down.
    async fn release(&self, stream: &MediaStream) -> MediaResult<()>;
}

/// Check that `stream` carries every expected kind and nothing else
pub fn validate_stream(stream: &MediaStream, expected: &[TrackKind]) -> MediaResult<()> {
    let requested = expected.first().copied().unwrap_or(TrackKind::Video);

    if stream.is_empty() {
        return Err(MediaError::CreationFailure {
            kind: requested,
            reason: "capture produced an empty stream".to_string(),
        });
    }

    for kind in expected {
        if stream.track_of(*kind).is_none() {
            return Err(MediaError::CreationFailure {
                kind: *kind,
                reason: format!("stream {} has no {} track", stream.id(), kind),
            });
        }
    }

    if let Some(unexpected) = stream.kinds().into_iter().find(|k| !expected.contains(k)) {
        return Err(MediaError::CreationFailure {
            kind: requested,
            reason: format!("stream {} carries unrequested {} track", stream.id(), unexpected),
        });
    }

    Ok(())
}

/// Validate options, acquire, and validate the resulting stream.
///
/// A stream that fails validation is released before the error is returned.
pub async fn acquire_validated(
    provider: &dyn CaptureProvider,
    options: &CaptureOptions,
) -> MediaResult<MediaStream> {
    options.validate()?;

    let stream = provider.acquire(options).await?;
    let expected = options.expected_kinds();

    if let Err(e) = validate_stream(&stream, &expected) {
        stream.stop();
        if let Err(release_err) = provider.release(&stream).await {
            warn!(
                "⚠️ Failed to release rejected stream {}: {}",
                stream.id(),
                release_err
            );
        }
        return Err(e);
    }

    debug!(
        "🎥 Acquired {} stream {} with {:?}",
        options.variant(),
        stream.id(),
        expected
    );
    Ok(stream)
}
