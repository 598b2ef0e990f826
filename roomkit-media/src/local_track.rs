//! Local track lifecycle controller
//!
//! [`LocalTrack`] is the single authority over a captured track's stream,
//! processor, mute state and publish flag. Every mutating operation holds the
//! track's async mutex from start to finish, including while it waits on
//! capture, processor init/destroy or the transport sender, so two operations
//! on the same track never interleave.
//!
//! Cleanup paths (releasing capture, destroying processors, swapping the
//! sender's media) log failures and keep going. Creation and usage failures
//! are returned to the caller.

use crate::capture::{self, CaptureProvider};
use crate::error::{MediaError, MediaResult};
use crate::options::CaptureOptions;
use crate::processing::{ProcessorOptions, TrackProcessor};
use crate::sender::{TrackSender, TrackSignaler};
use crate::stream::{MediaStream, MediaStreamTrack};
use crate::tracks::{new_track_id, TrackEvent, TrackKind, TrackSource, TrackState};
use chrono::{DateTime, Utc};
use roomkit_core::{EventBus, EventStream};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A locally captured audio or video track
#[derive(Clone)]
pub struct LocalTrack {
    shared: Arc<Shared>,
}

struct Shared {
    id: String,
    kind: TrackKind,
    source: TrackSource,
    created_at: DateTime<Utc>,
    provider: Arc<dyn CaptureProvider>,
    events: EventBus<TrackEvent>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: TrackState,
    options: CaptureOptions,
    stream: Option<MediaStream>,
    processor: Option<AttachedProcessor>,
    published: bool,
    sender: Option<Arc<dyn TrackSender>>,
    signaler: Option<Arc<dyn TrackSignaler>>,
}

struct AttachedProcessor {
    processor: Box<dyn TrackProcessor>,
    initialized: bool,
}

impl LocalTrack {
    /// Capture a single track.
    ///
    /// Options producing more than one kind (screen share with audio, multi-kind
    /// custom sources) must go through [`LocalTrack::create_tracks`].
    pub async fn create(
        options: CaptureOptions,
        provider: Arc<dyn CaptureProvider>,
    ) -> MediaResult<LocalTrack> {
        let kinds = options.expected_kinds();
        if kinds.len() != 1 {
            return Err(MediaError::Usage {
                message: format!(
                    "{} options produce {} kinds; use create_tracks",
                    options.variant(),
                    kinds.len()
                ),
            });
        }

        let mut tracks = Self::create_tracks(options, provider).await?;
        tracks.pop().ok_or_else(|| MediaError::InvalidState {
            message: "capture produced no track".to_string(),
        })
    }

    /// Capture once and wrap every resulting kind in its own track
    pub async fn create_tracks(
        options: CaptureOptions,
        provider: Arc<dyn CaptureProvider>,
    ) -> MediaResult<Vec<LocalTrack>> {
        let mut stream = capture::acquire_validated(provider.as_ref(), &options).await?;

        let mut tracks = Vec::new();
        for kind in options.expected_kinds() {
            let (own, rest) = stream.split_kind(kind);
            tracks.push(Self::from_stream(kind, options.clone(), own, Arc::clone(&provider)));
            stream = rest.unwrap_or_else(|| MediaStream::new(Vec::new()));
        }
        Ok(tracks)
    }

    fn from_stream(
        kind: TrackKind,
        options: CaptureOptions,
        stream: MediaStream,
        provider: Arc<dyn CaptureProvider>,
    ) -> LocalTrack {
        let source = options.source_for(kind);
        let id = new_track_id();
        info!(
            "🎬 Creating local {} track: {} (source: {})",
            kind, id, source
        );

        LocalTrack {
            shared: Arc::new(Shared {
                id,
                kind,
                source,
                created_at: Utc::now(),
                provider,
                events: EventBus::new(),
                inner: Mutex::new(Inner {
                    state: TrackState::Live,
                    options,
                    stream: Some(stream),
                    processor: None,
                    published: false,
                    sender: None,
                    signaler: None,
                }),
            }),
        }
    }

    /// Get track ID
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Get track kind
    pub fn kind(&self) -> TrackKind {
        self.shared.kind
    }

    /// Get track source
    pub fn source(&self) -> TrackSource {
        self.shared.source
    }

    /// When the track was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.shared.created_at
    }

    /// Observe lifecycle events
    pub fn subscribe(&self) -> EventStream<TrackEvent> {
        self.shared.events.subscribe()
    }

    /// Current lifecycle state
    pub async fn state(&self) -> TrackState {
        self.shared.inner.lock().await.state
    }

    /// Check if track is muted
    pub async fn is_muted(&self) -> bool {
        self.state().await.is_muted()
    }

    /// Check if track has been stopped
    pub async fn is_stopped(&self) -> bool {
        self.state().await.is_stopped()
    }

    /// Check if track is published
    pub async fn is_published(&self) -> bool {
        self.shared.inner.lock().await.published
    }

    /// Options the current stream was captured with
    pub async fn options(&self) -> CaptureOptions {
        self.shared.inner.lock().await.options.clone()
    }

    /// Raw capture stream, if one is held
    pub async fn stream(&self) -> Option<MediaStream> {
        self.shared.inner.lock().await.stream.clone()
    }

    /// Media currently handed to the sender: processed output if a processor
    /// provides one, otherwise the raw track
    pub async fn effective_track(&self) -> Option<Arc<MediaStreamTrack>> {
        let inner = self.shared.inner.lock().await;
        self.effective_track_locked(&inner)
    }

    /// Name of the attached processor
    pub async fn processor_name(&self) -> Option<String> {
        let inner = self.shared.inner.lock().await;
        inner
            .processor
            .as_ref()
            .map(|p| p.processor.name().to_string())
    }

    /// Attach the transport sender and hand it the current media
    pub async fn attach_sender(&self, sender: Arc<dyn TrackSender>) {
        let mut inner = self.shared.inner.lock().await;
        inner.sender = Some(sender);
        self.substitute_at_sender(&inner).await;
    }

    /// Detach the transport sender
    pub async fn detach_sender(&self) -> Option<Arc<dyn TrackSender>> {
        self.shared.inner.lock().await.sender.take()
    }

    /// Set where mute changes are announced
    pub async fn set_signaler(&self, signaler: Option<Arc<dyn TrackSignaler>>) {
        self.shared.inner.lock().await.signaler = signaler;
    }

    /// Mute the track.
    ///
    /// Disables output, optionally releases capture (camera and microphone
    /// only), flips the mute state, then signals it. Returns false without side
    /// effects when already muted or stopped.
    pub async fn mute(&self, stop_underlying_capture: bool) -> bool {
        let mut inner = self.shared.inner.lock().await;
        match inner.state {
            TrackState::Muted | TrackState::MutedReleased | TrackState::Stopped => return false,
            TrackState::Live | TrackState::Interrupted => {}
        }

        info!("🔇 Muting local track: {}", self.id());
        self.set_output_enabled(&inner, false);

        let release = stop_underlying_capture && self.releases_capture_on_mute();
        if release {
            debug!("Releasing capture for muted track {}", self.id());
            self.release_capture(&mut inner).await;
        }

        inner.state = if inner.stream.is_some() {
            TrackState::Muted
        } else {
            TrackState::MutedReleased
        };

        self.signal_mute(&inner, true);
        self.emit(TrackEvent::Muted {
            track_id: self.id().to_string(),
        });
        true
    }

    /// Unmute the track.
    ///
    /// Reacquires capture first when it was released on mute, when the stream
    /// has ended, or when `restart_underlying_capture` is set for a source
    /// whose capture is released on mute. Returns false when not muted.
    pub async fn unmute(&self, restart_underlying_capture: bool) -> MediaResult<bool> {
        let mut inner = self.shared.inner.lock().await;
        match inner.state {
            TrackState::Live | TrackState::Interrupted | TrackState::Stopped => return Ok(false),
            TrackState::Muted | TrackState::MutedReleased => {}
        }

        info!("🔊 Unmuting local track: {}", self.id());
        let stream_ended = inner.stream.as_ref().map_or(true, |s| !s.is_live());
        let needs_restart = inner.state == TrackState::MutedReleased
            || stream_ended
            || (restart_underlying_capture && self.releases_capture_on_mute());

        if needs_restart {
            self.restart_locked(&mut inner, None).await?;
        }

        inner.state = TrackState::Live;
        self.set_output_enabled(&inner, true);
        self.signal_mute(&inner, false);
        self.emit(TrackEvent::Unmuted {
            track_id: self.id().to_string(),
        });
        Ok(true)
    }

    /// Tear down capture and acquire a new stream.
    ///
    /// `new_options` defaults to the options currently in effect and must be of
    /// the same variant; a mismatch fails before anything is touched.
    pub async fn restart(&self, new_options: Option<CaptureOptions>) -> MediaResult<()> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_stopped() {
            return Err(MediaError::InvalidState {
                message: format!("track {} is stopped", self.id()),
            });
        }
        self.restart_locked(&mut inner, new_options).await
    }

    /// Stop the track for good. Returns false if it was already stopped.
    pub async fn stop(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_stopped() {
            return false;
        }

        info!("⏹️ Stopping local track: {}", self.id());
        if let Some(attached) = inner.processor.take() {
            self.destroy_processor(attached).await;
        }
        self.release_capture(&mut inner).await;
        inner.state = TrackState::Stopped;

        self.emit(TrackEvent::Ended {
            track_id: self.id().to_string(),
        });
        true
    }

    /// Attach a processor, destroying any existing one first.
    ///
    /// `None` is a no-op; use [`LocalTrack::stop_processor`] to clear. When the
    /// track holds no stream (capture released on mute) the processor is
    /// initialized on the next restart.
    pub async fn set_processor(
        &self,
        processor: Option<Box<dyn TrackProcessor>>,
    ) -> MediaResult<()> {
        let Some(processor) = processor else {
            debug!("No processor given for track {}, keeping current", self.id());
            return Ok(());
        };

        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_stopped() {
            return Err(MediaError::InvalidState {
                message: format!("cannot attach processor to stopped track {}", self.id()),
            });
        }

        if let Some(previous) = inner.processor.take() {
            self.destroy_processor(previous).await;
        }

        let name = processor.name().to_string();
        info!("🪄 Attaching processor {} to track {}", name, self.id());
        inner.processor = Some(AttachedProcessor {
            processor,
            initialized: false,
        });

        let result = self.init_processor(&mut inner).await;
        if result.is_err() {
            inner.processor = None;
        }
        self.substitute_at_sender(&inner).await;

        let attached = inner
            .processor
            .as_ref()
            .map(|p| p.processor.name().to_string());
        self.emit(TrackEvent::ProcessorUpdated {
            track_id: self.id().to_string(),
            processor: attached,
        });
        result
    }

    /// Destroy and detach the processor.
    ///
    /// Always emits a processor update so observers can reset, even when
    /// nothing was attached. Returns whether a processor was removed.
    pub async fn stop_processor(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        let removed = match inner.processor.take() {
            Some(attached) => {
                info!(
                    "🧹 Removing processor {} from track {}",
                    attached.processor.name(),
                    self.id()
                );
                self.destroy_processor(attached).await;
                if !inner.state.is_stopped() {
                    self.set_output_enabled(&inner, !inner.state.is_muted());
                    self.substitute_at_sender(&inner).await;
                }
                true
            }
            None => false,
        };

        self.emit(TrackEvent::ProcessorUpdated {
            track_id: self.id().to_string(),
            processor: None,
        });
        removed
    }

    /// Mark the track published. Returns false if it already was.
    pub async fn on_publish(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.published || inner.state.is_stopped() {
            return false;
        }
        inner.published = true;
        debug!("📤 Local track {} published", self.id());
        self.emit(TrackEvent::Published {
            track_id: self.id().to_string(),
        });
        true
    }

    /// Mark the track unpublished. Returns false if it was not published.
    pub async fn on_unpublish(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if !inner.published {
            return false;
        }
        inner.published = false;
        debug!("📥 Local track {} unpublished", self.id());
        self.emit(TrackEvent::Unpublished {
            track_id: self.id().to_string(),
        });
        true
    }

    /// Whether muting may release capture, by kind and source
    fn releases_capture_on_mute(&self) -> bool {
        match self.shared.kind {
            TrackKind::Video => self.shared.source == TrackSource::Camera,
            TrackKind::Audio => self.shared.source == TrackSource::Microphone,
        }
    }

    async fn restart_locked(
        &self,
        inner: &mut Inner,
        new_options: Option<CaptureOptions>,
    ) -> MediaResult<()> {
        let options = match new_options {
            Some(options) => {
                inner.options.ensure_same_variant(&options)?;
                options.validate()?;
                options
            }
            None => inner.options.clone(),
        };

        info!("🔄 Restarting local track: {}", self.id());
        let was_muted = inner.state.is_muted();
        self.release_capture(inner).await;

        let scoped = options.scoped_to(self.shared.kind);
        let acquired =
            match capture::acquire_validated(self.shared.provider.as_ref(), &scoped).await {
                Ok(stream) => stream,
                Err(e) => {
                    inner.state = if was_muted {
                        TrackState::MutedReleased
                    } else {
                        TrackState::Interrupted
                    };
                    warn!("❌ Restart of track {} failed: {}", self.id(), e);
                    return Err(e);
                }
            };

        let (stream, rest) = acquired.split_kind(self.shared.kind);
        if let Some(rest) = rest {
            rest.stop();
            if let Err(e) = self.shared.provider.release(&rest).await {
                warn!("⚠️ Failed to release unused capture for {}: {}", self.id(), e);
            }
        }
        stream.set_enabled(!was_muted);
        inner.stream = Some(stream);
        inner.options = options.clone();

        if let Err(e) = self.init_processor(inner).await {
            warn!(
                "⚠️ Processor could not be reattached to track {}: {}",
                self.id(),
                e
            );
            inner.processor = None;
            self.emit(TrackEvent::ProcessorUpdated {
                track_id: self.id().to_string(),
                processor: None,
            });
        }

        self.substitute_at_sender(inner).await;
        inner.state = if was_muted {
            TrackState::Muted
        } else {
            TrackState::Live
        };

        self.emit(TrackEvent::OptionsUpdated {
            track_id: self.id().to_string(),
            options,
        });
        Ok(())
    }

    /// Initialize the attached processor on the current stream, if both exist
    async fn init_processor(&self, inner: &mut Inner) -> MediaResult<()> {
        let Some(stream) = inner.stream.clone() else {
            return Ok(());
        };
        let muted = inner.state.is_muted();
        let Some(attached) = inner.processor.as_mut() else {
            return Ok(());
        };
        if attached.initialized {
            return Ok(());
        }

        let name = attached.processor.name().to_string();
        let options = ProcessorOptions {
            kind: self.shared.kind,
            stream,
        };
        attached.processor.init(options).await.map_err(|e| match e {
            e @ MediaError::ProcessorInit { .. } => e,
            other => MediaError::ProcessorInit {
                name: name.clone(),
                reason: other.to_string(),
            },
        })?;
        attached.initialized = true;

        if let Some(processed) = attached.processor.processed_stream() {
            processed.set_enabled(!muted);
        }
        debug!("Processor {} initialized on track {}", name, self.id());
        Ok(())
    }

    async fn destroy_processor(&self, mut attached: AttachedProcessor) {
        if !attached.initialized {
            return;
        }
        if let Err(e) = attached.processor.destroy().await {
            warn!(
                "⚠️ Failed to destroy processor {} on track {}: {}",
                attached.processor.name(),
                self.id(),
                e
            );
        }
    }

    /// Destroy the processor's running state and release the raw stream.
    /// The processor stays attached so a restart can reinitialize it.
    async fn release_capture(&self, inner: &mut Inner) {
        if let Some(attached) = inner.processor.as_mut() {
            if attached.initialized {
                if let Err(e) = attached.processor.destroy().await {
                    warn!(
                        "⚠️ Failed to destroy processor {} on track {}: {}",
                        attached.processor.name(),
                        self.id(),
                        e
                    );
                }
                attached.initialized = false;
            }
        }

        if let Some(stream) = inner.stream.take() {
            stream.stop();
            if let Err(e) = self.shared.provider.release(&stream).await {
                warn!("⚠️ Failed to release capture for track {}: {}", self.id(), e);
            }
        }
    }

    fn effective_track_locked(&self, inner: &Inner) -> Option<Arc<MediaStreamTrack>> {
        let processed = inner
            .processor
            .as_ref()
            .filter(|p| p.initialized)
            .and_then(|p| p.processor.processed_stream())
            .and_then(|s| s.track_of(self.shared.kind).cloned());

        processed.or_else(|| {
            inner
                .stream
                .as_ref()
                .and_then(|s| s.track_of(self.shared.kind).cloned())
        })
    }

    fn set_output_enabled(&self, inner: &Inner, enabled: bool) {
        if let Some(stream) = &inner.stream {
            stream.set_enabled(enabled);
        }
        if let Some(processed) = inner
            .processor
            .as_ref()
            .filter(|p| p.initialized)
            .and_then(|p| p.processor.processed_stream())
        {
            processed.set_enabled(enabled);
        }
    }

    /// Hand the effective media to the sender; failures are logged only
    async fn substitute_at_sender(&self, inner: &Inner) {
        let Some(sender) = inner.sender.clone() else {
            return;
        };
        let track = self.effective_track_locked(inner);
        if let Err(e) = sender.replace_track(track).await {
            warn!(
                "⚠️ Transport substitution failed for track {}: {}",
                self.id(),
                e
            );
        }
    }

    fn signal_mute(&self, inner: &Inner, muted: bool) {
        if let Some(signaler) = &inner.signaler {
            signaler.send_mute(self.id(), muted);
        }
    }

    fn emit(&self, event: TrackEvent) {
        self.shared.events.emit(event);
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.shared.id)
            .field("kind", &self.shared.kind)
            .field("source", &self.shared.source)
            .finish()
    }
}
