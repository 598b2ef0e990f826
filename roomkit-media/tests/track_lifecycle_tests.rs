//! Integration tests for the local track lifecycle controller
//!
//! Tracks are driven against the mock capture provider plus recording
//! processors, senders and signalers so every side effect can be counted.

use async_trait::async_trait;
use parking_lot::Mutex;
use roomkit_media::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// TEST DOUBLES
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

/// Processor that logs its lifecycle and produces a fresh output per init
struct RecordingProcessor {
    name: String,
    log: Log,
    output: Option<MediaStream>,
    fail_init: bool,
}

impl RecordingProcessor {
    fn boxed(name: &str, log: &Log) -> Box<dyn TrackProcessor> {
        Box::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            output: None,
            fail_init: false,
        })
    }

    fn failing(name: &str, log: &Log) -> Box<dyn TrackProcessor> {
        Box::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            output: None,
            fail_init: true,
        })
    }
}

#[async_trait]
impl TrackProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self, options: ProcessorOptions) -> MediaResult<()> {
        self.log.lock().push(format!("{}.init", self.name));
        if self.fail_init {
            return Err(MediaError::ProcessorInit {
                name: self.name.clone(),
                reason: "model failed to load".to_string(),
            });
        }
        assert!(options.track().is_some());
        self.output = Some(MediaStream::new(vec![MediaStreamTrack::new(
            options.kind,
            format!("{} output", self.name),
        )]));
        Ok(())
    }

    fn processed_stream(&self) -> Option<MediaStream> {
        self.output.clone()
    }

    async fn destroy(&mut self) -> MediaResult<()> {
        self.log.lock().push(format!("{}.destroy", self.name));
        if let Some(output) = self.output.take() {
            output.stop();
        }
        Ok(())
    }
}

fn count(log: &Log, entry: &str) -> usize {
    log.lock().iter().filter(|e| e.as_str() == entry).count()
}

/// Sender remembering every track it was handed
#[derive(Default)]
struct RecordingSender {
    tracks: Mutex<Vec<Option<String>>>,
    fail: AtomicBool,
}

impl RecordingSender {
    fn last(&self) -> Option<Option<String>> {
        self.tracks.lock().last().cloned()
    }
}

#[async_trait]
impl TrackSender for RecordingSender {
    async fn replace_track(&self, track: Option<Arc<MediaStreamTrack>>) -> MediaResult<()> {
        self.tracks
            .lock()
            .push(track.map(|t| t.id().to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediaError::TransportSubstitution {
                reason: "sender closed".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSignaler {
    pushes: Mutex<Vec<(String, bool)>>,
}

impl TrackSignaler for RecordingSignaler {
    fn send_mute(&self, track_id: &str, muted: bool) {
        self.pushes.lock().push((track_id.to_string(), muted));
    }
}

async fn camera_track() -> (LocalTrack, Arc<MockCaptureProvider>) {
    let provider = Arc::new(MockCaptureProvider::new());
    let track = LocalTrack::create(CaptureOptions::camera(), provider.clone())
        .await
        .unwrap();
    (track, provider)
}

fn event_types(events: &mut roomkit_core::EventStream<TrackEvent>) -> Vec<&'static str> {
    events.drain().iter().map(|e| e.event_type()).collect()
}

// ============================================================================
// IDEMPOTENCE
// ============================================================================

#[tokio::test]
async fn test_mute_and_unmute_are_idempotent() {
    let (track, _provider) = camera_track().await;

    assert_eq!((track.mute(false).await, track.mute(false).await), (true, false));
    assert!(tokio_test::assert_ok!(track.unmute(false).await));
    assert!(!tokio_test::assert_ok!(track.unmute(false).await));
}

#[tokio::test]
async fn test_publish_flags_are_idempotent() {
    let (track, _provider) = camera_track().await;
    let mut events = track.subscribe();

    assert_eq!((track.on_publish().await, track.on_publish().await), (true, false));
    assert!(track.is_published().await);
    assert_eq!(
        (track.on_unpublish().await, track.on_unpublish().await),
        (true, false)
    );

    assert_eq!(event_types(&mut events), vec!["published", "unpublished"]);
}

#[tokio::test]
async fn test_stop_releases_stream_and_is_idempotent() {
    let (track, provider) = camera_track().await;
    let stream = track.stream().await.unwrap();
    let mut events = track.subscribe();

    assert!(track.stop().await);
    assert!(!track.stop().await);

    assert!(track.stream().await.is_none());
    assert!(!stream.is_live());
    assert_eq!(provider.releases(), 1);
    assert_eq!(event_types(&mut events), vec!["ended"]);
}

#[tokio::test]
async fn test_stop_swallows_release_failures() {
    let (track, provider) = camera_track().await;
    let log: Log = Arc::default();
    track
        .set_processor(Some(RecordingProcessor::boxed("blur", &log)))
        .await
        .unwrap();
    provider.fail_releases(true);
    let mut events = track.subscribe();

    assert!(track.stop().await);
    assert_eq!(track.state().await, TrackState::Stopped);
    assert_eq!(count(&log, "blur.destroy"), 1);
    assert_eq!(event_types(&mut events), vec!["ended"]);
}

// ============================================================================
// RESTART
// ============================================================================

#[tokio::test]
async fn test_restart_with_other_variant_leaves_state_untouched() {
    let (track, provider) = camera_track().await;
    let log: Log = Arc::default();
    track
        .set_processor(Some(RecordingProcessor::boxed("blur", &log)))
        .await
        .unwrap();
    track.mute(false).await;
    let stream_id = track.stream().await.unwrap().id().to_string();

    let err = tokio_test::assert_err!(track.restart(Some(CaptureOptions::microphone())).await);
    assert!(matches!(err, MediaError::Usage { .. }));

    assert_eq!(track.stream().await.unwrap().id(), stream_id);
    assert!(track.is_muted().await);
    assert_eq!(track.processor_name().await.as_deref(), Some("blur"));
    assert_eq!(count(&log, "blur.destroy"), 0);
    assert_eq!(provider.acquisitions(), 1);
    assert_eq!(track.options().await.variant(), CaptureVariant::Camera);
}

#[tokio::test]
async fn test_restart_switches_device_and_reattaches_processor() {
    let (track, provider) = camera_track().await;
    let sender = Arc::new(RecordingSender::default());
    track.attach_sender(sender.clone()).await;
    let log: Log = Arc::default();
    track
        .set_processor(Some(RecordingProcessor::boxed("blur", &log)))
        .await
        .unwrap();
    let old_stream = track.stream().await.unwrap();
    let mut events = track.subscribe();

    let switched = CaptureOptions::Camera(VideoCaptureOptions {
        device_id: Some("usb-cam-2".to_string()),
        ..Default::default()
    });
    track.restart(Some(switched.clone())).await.unwrap();

    let new_stream = track.stream().await.unwrap();
    assert_ne!(new_stream.id(), old_stream.id());
    assert!(!old_stream.is_live());
    assert_eq!(provider.acquisitions(), 2);
    assert_eq!(track.options().await, switched);

    assert_eq!(
        *log.lock(),
        vec!["blur.init", "blur.destroy", "blur.init"]
    );

    // The sender carries the processed output of the new stream
    let effective = track.effective_track().await.unwrap();
    assert_ne!(
        Some(effective.id()),
        new_stream.track_of(TrackKind::Video).map(|t| t.id())
    );
    assert_eq!(sender.last(), Some(Some(effective.id().to_string())));

    let events = events.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        TrackEvent::OptionsUpdated {
            track_id: track.id().to_string(),
            options: switched,
        }
    );
}

#[tokio::test]
async fn test_sender_failure_during_restart_is_not_fatal() {
    let (track, _provider) = camera_track().await;
    let sender = Arc::new(RecordingSender::default());
    track.attach_sender(sender.clone()).await;
    sender.fail.store(true, Ordering::SeqCst);
    let old_id = track.stream().await.unwrap().id().to_string();

    tokio_test::assert_ok!(track.restart(None).await);

    let new_stream = track.stream().await.unwrap();
    assert_ne!(new_stream.id(), old_id);
    assert_eq!(track.state().await, TrackState::Live);
    let raw_id = new_stream.track_of(TrackKind::Video).unwrap().id().to_string();
    assert_eq!(sender.last(), Some(Some(raw_id)));
}

#[tokio::test]
async fn test_failed_acquisition_interrupts_until_next_restart() {
    let (track, provider) = camera_track().await;
    provider.fail_next(MockFailure::EmptyStream);

    let err = tokio_test::assert_err!(track.restart(None).await);
    assert!(matches!(err, MediaError::CreationFailure { .. }));
    assert_eq!(track.state().await, TrackState::Interrupted);
    assert!(track.stream().await.is_none());

    track.restart(None).await.unwrap();
    assert_eq!(track.state().await, TrackState::Live);
    assert!(track.stream().await.unwrap().is_live());
}

// ============================================================================
// PROCESSORS
// ============================================================================

#[tokio::test]
async fn test_replacing_processor_destroys_previous_first() {
    let (track, _provider) = camera_track().await;
    let log: Log = Arc::default();

    track
        .set_processor(Some(RecordingProcessor::boxed("p1", &log)))
        .await
        .unwrap();
    track
        .set_processor(Some(RecordingProcessor::boxed("p2", &log)))
        .await
        .unwrap();

    assert_eq!(*log.lock(), vec!["p1.init", "p1.destroy", "p2.init"]);
    assert_eq!(track.processor_name().await.as_deref(), Some("p2"));
}

#[tokio::test]
async fn test_set_processor_none_keeps_current() {
    let (track, _provider) = camera_track().await;
    let log: Log = Arc::default();
    track
        .set_processor(Some(RecordingProcessor::boxed("blur", &log)))
        .await
        .unwrap();
    let mut events = track.subscribe();

    track.set_processor(None).await.unwrap();

    assert_eq!(track.processor_name().await.as_deref(), Some("blur"));
    assert_eq!(count(&log, "blur.destroy"), 0);
    assert!(event_types(&mut events).is_empty());
}

#[tokio::test]
async fn test_stop_processor_twice_emits_each_time_destroys_once() {
    let (track, _provider) = camera_track().await;
    let sender = Arc::new(RecordingSender::default());
    track.attach_sender(sender.clone()).await;
    let log: Log = Arc::default();
    track
        .set_processor(Some(RecordingProcessor::boxed("blur", &log)))
        .await
        .unwrap();
    let mut events = track.subscribe();

    assert!(track.stop_processor().await);
    assert!(!track.stop_processor().await);

    assert_eq!(
        event_types(&mut events),
        vec!["processor_updated", "processor_updated"]
    );
    assert_eq!(count(&log, "blur.destroy"), 1);
    assert!(track.processor_name().await.is_none());

    // Raw media is back at the sender
    let raw = track.stream().await.unwrap();
    let raw_id = raw.track_of(TrackKind::Video).unwrap().id().to_string();
    assert_eq!(sender.last(), Some(Some(raw_id)));
}

#[tokio::test]
async fn test_failed_processor_init_clears_slot_and_still_notifies() {
    let (track, _provider) = camera_track().await;
    let log: Log = Arc::default();
    let mut events = track.subscribe();

    let err = track
        .set_processor(Some(RecordingProcessor::failing("broken", &log)))
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::ProcessorInit { .. }));
    assert!(track.processor_name().await.is_none());

    let events = events.drain();
    assert_eq!(
        events,
        vec![TrackEvent::ProcessorUpdated {
            track_id: track.id().to_string(),
            processor: None,
        }]
    );
}

#[tokio::test]
async fn test_processor_follows_capture_release_on_mute() {
    let (track, _provider) = camera_track().await;
    let log: Log = Arc::default();
    track
        .set_processor(Some(RecordingProcessor::boxed("blur", &log)))
        .await
        .unwrap();

    track.mute(true).await;
    assert_eq!(*log.lock(), vec!["blur.init", "blur.destroy"]);

    track.unmute(true).await.unwrap();
    assert_eq!(
        *log.lock(),
        vec!["blur.init", "blur.destroy", "blur.init"]
    );
    assert!(track.effective_track().await.unwrap().is_enabled());
}

// ============================================================================
// MUTE POLICY AND SIGNALING
// ============================================================================

#[tokio::test]
async fn test_mute_pushes_state_once_per_transition() {
    let (track, _provider) = camera_track().await;
    let signaler = Arc::new(RecordingSignaler::default());
    track.set_signaler(Some(signaler.clone())).await;

    track.mute(false).await;
    track.mute(false).await;
    track.unmute(false).await.unwrap();

    let id = track.id().to_string();
    assert_eq!(
        *signaler.pushes.lock(),
        vec![(id.clone(), true), (id, false)]
    );
}

#[tokio::test]
async fn test_screen_share_mute_never_releases_capture() {
    let provider = Arc::new(MockCaptureProvider::new());
    let track = LocalTrack::create(CaptureOptions::screen_share(), provider.clone())
        .await
        .unwrap();
    let stream = track.stream().await.unwrap();

    assert!(track.mute(true).await);
    assert_eq!(track.state().await, TrackState::Muted);
    assert!(stream.is_live());
    assert_eq!(provider.releases(), 0);

    assert!(track.unmute(true).await.unwrap());
    assert_eq!(provider.acquisitions(), 1);
}

#[tokio::test]
async fn test_screen_share_with_audio_yields_two_tracks() {
    let provider = Arc::new(MockCaptureProvider::new());
    let options = CaptureOptions::ScreenShare(ScreenShareCaptureOptions {
        audio: true,
        prefer_current_tab: true,
        ..Default::default()
    });

    let tracks = LocalTrack::create_tracks(options, provider.clone())
        .await
        .unwrap();
    let sources: Vec<TrackSource> = tracks.iter().map(|t| t.source()).collect();
    assert_eq!(
        sources,
        vec![TrackSource::ScreenShare, TrackSource::ScreenShareAudio]
    );
    assert_eq!(provider.acquisitions(), 1);

    // Restarting the video half only asks for video
    tracks[0].restart(None).await.unwrap();
    let last = provider.acquired_options().pop().unwrap();
    assert_eq!(last.expected_kinds(), vec![TrackKind::Video]);
}

#[tokio::test]
async fn test_stopping_one_half_of_shared_capture_keeps_the_other() {
    let provider = Arc::new(MockCaptureProvider::new());
    let options = CaptureOptions::ScreenShare(ScreenShareCaptureOptions {
        audio: true,
        ..Default::default()
    });

    let tracks = LocalTrack::create_tracks(options, provider.clone())
        .await
        .unwrap();
    let video = tracks[0].stream().await.unwrap();
    let audio = tracks[1].stream().await.unwrap();
    // Both halves come from one acquisition
    assert_eq!(video.id(), audio.id());
    let video_track_id = video.tracks()[0].id().to_string();

    assert!(tracks[0].stop().await);

    assert_eq!(provider.released_stream_ids(), vec![video.id().to_string()]);
    assert_eq!(provider.released_track_ids(), vec![video_track_id]);
    assert!(!video.is_live());
    assert!(audio.is_live());
    assert_eq!(tracks[1].state().await, TrackState::Live);
}

// ============================================================================
// END-TO-END
// ============================================================================

#[tokio::test]
async fn test_camera_mute_release_and_unmute_restart() {
    let provider = Arc::new(MockCaptureProvider::new());
    let options_a = CaptureOptions::Camera(VideoCaptureOptions {
        device_id: Some("front".to_string()),
        resolution: VideoResolution::VGA,
        ..Default::default()
    });
    let track = LocalTrack::create(options_a.clone(), provider.clone())
        .await
        .unwrap();
    assert!(track.on_publish().await);

    let original = track.stream().await.unwrap();
    let mut events = track.subscribe();

    assert!(track.mute(true).await);
    assert!(track.stream().await.is_none());
    assert!(!original.is_live());
    assert_eq!(provider.released_stream_ids(), vec![original.id().to_string()]);
    assert!(track.is_muted().await);
    assert_eq!(event_types(&mut events), vec!["muted"]);

    assert!(track.unmute(true).await.unwrap());
    assert_eq!(provider.acquisitions(), 2);
    assert_eq!(provider.acquired_options()[1], options_a);

    let fresh = track.stream().await.unwrap();
    assert_ne!(fresh.id(), original.id());
    assert!(fresh.is_live());
    assert!(fresh.tracks()[0].is_enabled());

    let events = event_types(&mut events);
    assert_eq!(events.iter().filter(|e| **e == "unmuted").count(), 1);
    assert_eq!(events.last(), Some(&"unmuted"));
}

// ============================================================================
// EXCLUSION
// ============================================================================

#[tokio::test]
async fn test_mutating_operations_on_one_track_do_not_interleave() {
    let provider =
        Arc::new(MockCaptureProvider::new().with_acquire_delay(Duration::from_millis(50)));
    let track = LocalTrack::create(CaptureOptions::camera(), provider.clone())
        .await
        .unwrap();

    let restarting = {
        let track = track.clone();
        tokio::spawn(async move { track.restart(None).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Waits for the restart to finish, then mutes the new stream
    assert!(track.mute(false).await);
    restarting.await.unwrap().unwrap();

    assert_eq!(provider.acquisitions(), 2);
    let stream = track.stream().await.unwrap();
    assert!(stream.is_live());
    assert!(!stream.tracks()[0].is_enabled());
    assert_eq!(track.state().await, TrackState::Muted);
}

#[test]
fn test_options_serialize_with_source_tag() {
    let value = serde_json::to_value(CaptureOptions::camera()).unwrap();
    assert_eq!(value["source"], "camera");
    assert_eq!(value["resolution"]["width"], 1280);

    let parsed: CaptureOptions = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.variant(), CaptureVariant::Camera);
}

#[test]
fn test_concurrent_tracks_are_independent() {
    tokio_test::block_on(async {
        let provider = Arc::new(MockCaptureProvider::new());
        let camera = LocalTrack::create(CaptureOptions::camera(), provider.clone());
        let mic = LocalTrack::create(CaptureOptions::microphone(), provider.clone());
        let (camera, mic) = futures::join!(camera, mic);
        let (camera, mic) = (camera.unwrap(), mic.unwrap());

        camera.mute(true).await;
        assert!(camera.is_muted().await);
        assert!(!mic.is_muted().await);
        assert_eq!(mic.kind(), TrackKind::Audio);
    });
}
