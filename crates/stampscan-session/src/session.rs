//! # Scan Session Controller
//!
//! Owns the camera. At most one session holds it at a time.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session State Machine                              │
//! │                                                                         │
//! │           start()                 stream open                           │
//! │   Idle ─────────────► Starting ─────────────────► Active                │
//! │    ▲                     │                          │                   │
//! │    │  acquisition error  │                          │ stop() / decode / │
//! │    ├─────────────────────┘                          │ decoder died      │
//! │    │                                                ▼                   │
//! │    └──────────────────────────────────────────── Stopping               │
//! │                                                                         │
//! │  start() while Starting/Active: Stopping → Idle, settle delay, then    │
//! │  the new generation begins. The delay counts from the last release,    │
//! │  whichever session released the camera.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Track count is 0 whenever the published status is `Idle`.
//! - Only the id the platform actually bound is written to the preference.
//! - Decode results of a superseded generation are dropped.
//! - The previous session is fully torn down before new hardware is requested.
//! - No new platform call is made for a generation that was stopped or
//!   disposed while it waited.
//!
//! Hosts must call [`ScanController::dispose`] exactly once when the scanner
//! screen goes away.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use stampscan_core::classify::{decoder_stopped, unsupported};
use stampscan_core::{
    classify, select_camera, DeviceDescriptor, ScanError, ScanStatus, SessionSnapshot,
    DEFAULT_SETTLE_DELAY_MS,
};

use crate::dispatcher::{DecodeDispatcher, DecodeListener, DispatchHandle};
use crate::enumerator::DeviceEnumerator;
use crate::error::StartError;
use crate::platform::{FrameDecoder, MediaPlatform, SharedStream, VideoSink};
use crate::preference::DevicePreference;
use crate::router::OutcomeRouter;

// =============================================================================
// Session State
// =============================================================================

/// Everything the live session owns. Guarded by `Shared::state`.
#[derive(Default)]
struct SessionState {
    snapshot: SessionSnapshot,
    stream: Option<SharedStream>,
    dispatch: Option<DispatchHandle>,
    sink: Option<VideoSink>,
    /// When tracks were last stopped, by any generation.
    released_at: Option<Instant>,
}

impl SessionState {
    /// Unsubscribes the decoder, stops every track and clears the sink.
    fn release(&mut self) {
        if let Some(dispatch) = self.dispatch.take() {
            dispatch.cancel();
        }

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.stop_all_tracks() {
                warn!(error = %e, "Failed to stop camera tracks");
            }
            self.released_at = Some(Instant::now());
        }

        if let Some(sink) = self.sink.take() {
            sink.unbind();
        }
    }

    fn is_starting(&self, generation: u64) -> bool {
        self.snapshot.is_generation(generation) && self.snapshot.status == ScanStatus::Starting
    }

    /// Part of `settle_delay` not yet elapsed since the last release.
    fn settle_remaining(&self, settle_delay: Duration) -> Duration {
        self.released_at
            .map(|at| settle_delay.saturating_sub(at.elapsed()))
            .unwrap_or_default()
    }
}

struct Shared {
    platform: Arc<dyn MediaPlatform>,
    enumerator: DeviceEnumerator,
    decoder: Arc<dyn FrameDecoder>,
    preference: DevicePreference,
    router: Arc<OutcomeRouter>,
    settle_delay: Duration,

    state: Mutex<SessionState>,
    /// Serializes `start` calls end to end.
    acquire: Mutex<()>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    disposed: AtomicBool,
}

impl Shared {
    fn publish(&self, state: &SessionState) {
        self.snapshot_tx.send_replace(state.snapshot.clone());
    }

    /// Live → Stopping → Idle, releasing hardware in between.
    fn teardown(&self, state: &mut SessionState, error: Option<ScanError>) {
        let generation = state.snapshot.generation;

        state.snapshot = state.snapshot.stopping();
        self.publish(state);

        state.release();

        state.snapshot = match error {
            Some(error) => state.snapshot.fail(error),
            None => state.snapshot.idle(),
        };
        self.publish(state);

        info!(generation, "Scan session stopped");
    }

    /// Ends an active `generation`. Returns false if it is no longer current.
    async fn finish(&self, generation: u64, error: Option<ScanError>) -> bool {
        let mut state = self.state.lock().await;
        if !state.snapshot.is_generation(generation) || state.snapshot.status != ScanStatus::Active {
            return false;
        }
        self.teardown(&mut state, error);
        true
    }

    /// Errors unless `generation` may still touch the camera.
    async fn ensure_starting(&self, generation: u64) -> Result<(), StartError> {
        let state = self.state.lock().await;
        if self.disposed.load(Ordering::SeqCst) {
            debug!(generation, "Scanner disposed while starting");
            return Err(StartError::Disposed);
        }
        if !state.is_starting(generation) {
            debug!(generation, "Start superseded before acquiring the camera");
            return Err(StartError::Superseded { generation });
        }
        Ok(())
    }

    /// Fails a start that is still current. Cleanup runs before the error
    /// is published.
    async fn fail_start(&self, generation: u64, error: ScanError) -> StartError {
        let mut state = self.state.lock().await;
        if !state.is_starting(generation) {
            debug!(generation, kind = %error.kind, "Acquisition failed after the session was superseded");
            return StartError::Superseded { generation };
        }

        state.release();
        state.snapshot = state.snapshot.fail(error.clone());
        self.publish(&state);

        warn!(generation, kind = %error.kind, "Scan session failed to start");
        StartError::Acquisition(error)
    }

    /// Selects and opens a camera for `generation`. Returns the negotiated id.
    async fn acquire_camera(
        self: &Arc<Self>,
        generation: u64,
        sink: &VideoSink,
    ) -> Result<Option<String>, StartError> {
        self.ensure_starting(generation).await?;

        if !self.platform.supports_capture() {
            return Err(self.fail_start(generation, unsupported()).await);
        }

        let stored = self.preference.get().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read preferred camera");
            None
        });

        let devices = match self.enumerator.list().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(generation, error = %e, "Device enumeration failed, opening camera unconstrained");
                Vec::new()
            }
        };

        // Enumeration may have taken a while
        self.ensure_starting(generation).await?;

        let selection = select_camera(&devices, stored.as_deref());
        if selection.stale_preference && !devices.is_empty() {
            match self.preference.clear() {
                Ok(()) => info!(stored_id = ?stored, "Cleared preferred camera that is no longer present"),
                Err(e) => warn!(error = %e, "Could not clear stale preferred camera"),
            }
        }

        debug!(
            generation,
            source = %selection.source,
            device_id = ?selection.device_id(),
            "Camera selected"
        );

        let stream = match self.platform.open_stream(selection.device_id()).await {
            Ok(stream) => stream,
            Err(failure) => {
                warn!(generation, error = %failure, "Camera acquisition failed");
                return Err(self.fail_start(generation, classify(&failure)).await);
            }
        };

        let mut state = self.state.lock().await;

        if !state.is_starting(generation) {
            if let Err(e) = stream.stop_all_tracks() {
                warn!(error = %e, "Failed to stop superseded camera tracks");
            }
            state.released_at = Some(Instant::now());
            drop(state);
            info!(generation, "Camera opened after the session was superseded; released");
            return Err(StartError::Superseded { generation });
        }

        let decodes = match self.decoder.subscribe(stream.clone()) {
            Ok(decodes) => decodes,
            Err(failure) => {
                state.stream = Some(stream);
                drop(state);
                warn!(generation, error = %failure, "Decoder subscription failed");
                return Err(self.fail_start(generation, classify(&failure)).await);
            }
        };

        sink.bind(stream.clone());

        let listener: Arc<dyn DecodeListener> = Arc::new(SessionListener {
            shared: Arc::downgrade(self),
        });
        state.dispatch = Some(DecodeDispatcher::spawn(generation, decodes, listener));
        state.stream = Some(stream.clone());

        let granted = stream.actual_device_id();
        let device = granted.as_ref().map(|id| {
            devices
                .iter()
                .find(|d| &d.id == id)
                .cloned()
                .unwrap_or_else(|| DeviceDescriptor::new(id.clone(), ""))
        });

        state.snapshot = state.snapshot.activate(device);
        self.publish(&state);

        info!(
            generation,
            requested = ?selection.device_id(),
            granted = ?granted,
            "Scan session active"
        );

        Ok(granted)
    }
}

// =============================================================================
// Decode Listener
// =============================================================================

/// Connects a dispatch loop back to the controller without keeping it alive.
struct SessionListener {
    shared: Weak<Shared>,
}

#[async_trait]
impl DecodeListener for SessionListener {
    async fn on_decoded(&self, generation: u64, text: String) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        if !shared.finish(generation, None).await {
            debug!(generation, "Discarding decode from superseded session");
            return;
        }

        let outcome = shared.router.route(&text).await;
        debug!(generation, route = %outcome.route(), success = outcome.is_success(), "Scan routed");
    }

    async fn on_decoder_died(&self, generation: u64, reason: String) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        if shared.finish(generation, Some(decoder_stopped())).await {
            warn!(generation, %reason, "Scan session ended by decoder failure");
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// The scan session controller.
///
/// ## Usage
/// ```rust,ignore
/// let controller = ScanControllerBuilder::new(platform, decoder, router)
///     .with_preference(preference)
///     .build();
///
/// let mut snapshots = controller.subscribe();
/// controller.start(sink.clone()).await?;
///
/// // ... the first decoded code stops the session and navigates ...
///
/// controller.dispose().await;
/// ```
pub struct ScanController {
    shared: Arc<Shared>,
}

impl ScanController {
    /// Opens the camera and starts scanning into `sink`.
    ///
    /// Tears down a live session first. The camera is not requested again
    /// until the settle delay has passed since tracks were last stopped.
    /// Returns the new generation. Acquisition errors are also published in
    /// the snapshot.
    pub async fn start(&self, sink: VideoSink) -> Result<u64, StartError> {
        let shared = &self.shared;
        let _acquire = shared.acquire.lock().await;

        let (generation, settle) = {
            let mut state = shared.state.lock().await;
            if shared.disposed.load(Ordering::SeqCst) {
                return Err(StartError::Disposed);
            }

            if state.snapshot.status.is_live() {
                info!(
                    generation = state.snapshot.generation,
                    "Restart requested, stopping current session"
                );
                shared.teardown(&mut state, None);
            }

            state.snapshot = state.snapshot.begin();
            state.sink = Some(sink.clone());
            shared.publish(&state);
            (
                state.snapshot.generation,
                state.settle_remaining(shared.settle_delay),
            )
        };

        info!(generation, "Scan session starting");

        if !settle.is_zero() {
            debug!(generation, wait_ms = settle.as_millis() as u64, "Waiting for the camera to settle");
            tokio::time::sleep(settle).await;
        }

        let granted = shared.acquire_camera(generation, &sink).await?;

        match granted {
            Some(device_id) => {
                if let Err(e) = shared.preference.set(&device_id) {
                    warn!(error = %e, "Could not save preferred camera");
                }
            }
            None => debug!(generation, "Platform reported no device id, preference unchanged"),
        }

        Ok(generation)
    }

    /// Stops the session and releases the camera. No-op when idle.
    pub async fn stop(&self) {
        let mut state = self.shared.state.lock().await;
        if !state.snapshot.status.is_live() {
            debug!("Stop requested while idle");
            return;
        }
        self.shared.teardown(&mut state, None);
    }

    /// Releases everything for good. Later `start` calls are refused.
    pub async fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            debug!("Scanner already disposed");
            return;
        }
        self.stop().await;
        info!("Scanner disposed");
    }

    /// Returns true once `dispose` has run.
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        if !self.shared.disposed.load(Ordering::SeqCst) {
            warn!("ScanController dropped without dispose(); the camera may still be held");
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a ScanController.
pub struct ScanControllerBuilder {
    platform: Arc<dyn MediaPlatform>,
    decoder: Arc<dyn FrameDecoder>,
    router: Arc<OutcomeRouter>,
    preference: Option<DevicePreference>,
    settle_delay: Duration,
}

impl ScanControllerBuilder {
    pub fn new(
        platform: Arc<dyn MediaPlatform>,
        decoder: Arc<dyn FrameDecoder>,
        router: Arc<OutcomeRouter>,
    ) -> Self {
        ScanControllerBuilder {
            platform,
            decoder,
            router,
            preference: None,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }

    /// Sets the camera preference. Defaults to an in-memory one.
    pub fn with_preference(mut self, preference: DevicePreference) -> Self {
        self.preference = Some(preference);
        self
    }

    /// Sets the pause between releasing and reopening the camera.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn build(self) -> ScanController {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());

        ScanController {
            shared: Arc::new(Shared {
                enumerator: DeviceEnumerator::new(self.platform.clone()),
                platform: self.platform,
                decoder: self.decoder,
                preference: self.preference.unwrap_or_else(DevicePreference::in_memory),
                router: self.router,
                settle_delay: self.settle_delay,
                state: Mutex::new(SessionState::default()),
                acquire: Mutex::new(()),
                snapshot_tx,
                disposed: AtomicBool::new(false),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::{CountingResolver, RecordingNavigator};
    use crate::simulator::{ScriptedDecoder, SimulatedPlatform};
    use stampscan_core::{DecodeOutcome, MediaFailure, ScanErrorKind, StampRecord};

    struct Harness {
        controller: ScanController,
        platform: Arc<SimulatedPlatform>,
        decoder: Arc<ScriptedDecoder>,
        preference: DevicePreference,
        navigator: Arc<RecordingNavigator>,
        resolver: Arc<CountingResolver>,
    }

    fn harness(cameras: &[(&str, &str)]) -> Harness {
        let platform = Arc::new(SimulatedPlatform::with_cameras(cameras));
        let decoder = Arc::new(ScriptedDecoder::new());
        let preference = DevicePreference::in_memory();
        let navigator = Arc::new(RecordingNavigator::default());
        let resolver = Arc::new(CountingResolver::new(vec![StampRecord::new("QR-ABC-001")]));

        let router = Arc::new(OutcomeRouter::new(
            "QR-",
            "/quiz",
            "/scan/fail",
            resolver.clone(),
            navigator.clone(),
        ));

        let controller = ScanControllerBuilder::new(platform.clone(), decoder.clone(), router)
            .with_preference(preference.clone())
            .build();

        Harness {
            controller,
            platform,
            decoder,
            preference,
            navigator,
            resolver,
        }
    }

    fn phone() -> Harness {
        harness(&[("front", "Front Camera"), ("back", "Back Camera")])
    }

    /// Lets spawned dispatch loops run to completion.
    async fn drain() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let h = phone();
        let rx = h.controller.subscribe();

        h.controller.stop().await;
        h.controller.stop().await;

        assert!(!rx.has_changed().unwrap());
        assert_eq!(h.controller.snapshot(), SessionSnapshot::default());
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_start_picks_back_camera_and_persists_negotiated_id() {
        let h = phone();
        h.platform.substitute("back", "back-hw-0");
        let sink = VideoSink::new();

        let generation = h.controller.start(sink.clone()).await.unwrap();
        assert_eq!(generation, 1);

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, ScanStatus::Active);
        assert_eq!(snapshot.device.unwrap().id, "back-hw-0");

        assert_eq!(h.platform.opens()[0].requested.as_deref(), Some("back"));
        assert_eq!(h.preference.get().unwrap().as_deref(), Some("back-hw-0"));
        assert!(sink.is_bound());
        assert_eq!(h.platform.live_tracks(), 1);

        h.controller.dispose().await;
        assert_eq!(h.platform.live_tracks(), 0);
        assert!(!sink.is_bound());
    }

    #[tokio::test]
    async fn test_stored_preference_bypasses_heuristics() {
        let h = phone();
        h.preference.set("front").unwrap();

        h.controller.start(VideoSink::new()).await.unwrap();
        assert_eq!(h.platform.opens()[0].requested.as_deref(), Some("front"));
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_stale_preference_falls_back_to_heuristics() {
        let h = phone();
        h.preference.set("unplugged").unwrap();

        h.controller.start(VideoSink::new()).await.unwrap();
        assert_eq!(h.platform.opens()[0].requested.as_deref(), Some("back"));
        assert_eq!(h.preference.get().unwrap().as_deref(), Some("back"));
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_enumeration_failure_opens_unconstrained() {
        let h = phone();
        h.preference.set("back").unwrap();
        h.platform
            .fail_next_listing(MediaFailure::from_name("AbortError", "enumeration aborted"));

        h.controller.start(VideoSink::new()).await.unwrap();
        assert_eq!(h.platform.opens()[0].requested, None);
        assert_eq!(h.controller.snapshot().status, ScanStatus::Active);
        h.controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_releases_tracks_then_waits_settle_delay() {
        let h = phone();

        let before = Instant::now();
        h.controller.start(VideoSink::new()).await.unwrap();
        assert!(before.elapsed() < Duration::from_millis(DEFAULT_SETTLE_DELAY_MS));

        let before = Instant::now();
        let generation = h.controller.start(VideoSink::new()).await.unwrap();
        assert_eq!(generation, 2);
        assert!(before.elapsed() >= Duration::from_millis(DEFAULT_SETTLE_DELAY_MS));

        let opens = h.platform.opens();
        assert_eq!(opens.len(), 2);
        assert_eq!(opens[1].live_before, 0);
        assert_eq!(h.platform.live_tracks(), 1);

        // The first generation's decoder was unsubscribed
        drain().await;
        assert!(h.decoder.feed(0).unwrap().is_closed());

        h.controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_starts_are_serialized() {
        let h = phone();

        let (first, second) = tokio::join!(
            h.controller.start(VideoSink::new()),
            h.controller.start(VideoSink::new())
        );
        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 2);

        assert!(h.platform.opens().iter().all(|open| open.live_before == 0));
        assert_eq!(h.platform.live_tracks(), 1);
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_decode_stops_session_and_routes_once() {
        let h = phone();
        let sink = VideoSink::new();
        h.controller.start(sink.clone()).await.unwrap();

        let feed = h.decoder.latest().unwrap();
        feed.no_result();
        feed.no_result();
        feed.decoded("QR-ABC-001");
        feed.decoded("QR-ABC-001");
        drain().await;

        assert_eq!(h.navigator.calls(), vec!["proceed:/quiz:QR-ABC-001".to_string()]);
        assert_eq!(h.resolver.lookups(), 1);

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, ScanStatus::Idle);
        assert_eq!(snapshot.error, None);
        assert_eq!(h.platform.live_tracks(), 0);
        assert!(!sink.is_bound());
        assert!(feed.is_closed());

        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_foreign_payload_never_reaches_resolver() {
        let h = phone();
        h.controller.start(VideoSink::new()).await.unwrap();

        h.decoder.latest().unwrap().decoded("JUNK");
        drain().await;

        assert_eq!(h.navigator.calls(), vec!["fail:/scan/fail".to_string()]);
        assert_eq!(h.resolver.lookups(), 0);
        assert_eq!(h.platform.live_tracks(), 0);
        h.controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_generation_decode_is_discarded() {
        let h = phone();
        h.controller.start(VideoSink::new()).await.unwrap();
        h.controller.start(VideoSink::new()).await.unwrap();

        // A late callback tagged with generation 1
        let listener = SessionListener {
            shared: Arc::downgrade(&h.controller.shared),
        };
        listener.on_decoded(1, "QR-ABC-001".to_string()).await;
        listener.on_decoder_died(1, "late".to_string()).await;

        assert_eq!(h.resolver.lookups(), 0);
        assert!(h.navigator.calls().is_empty());

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.status, ScanStatus::Active);
        assert_eq!(h.platform.live_tracks(), 1);

        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_permission_denied_cleans_up_and_reports() {
        let h = phone();
        h.platform
            .fail_next_open(MediaFailure::from_name("NotAllowedError", "Permission denied"));
        let sink = VideoSink::new();

        let err = h.controller.start(sink.clone()).await.unwrap_err();
        assert_eq!(err.scan_error().unwrap().kind, ScanErrorKind::PermissionDenied);

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, ScanStatus::Idle);
        assert_eq!(snapshot.error.unwrap().kind, ScanErrorKind::PermissionDenied);
        assert_eq!(h.platform.live_tracks(), 0);
        assert!(!sink.is_bound());
        assert_eq!(h.preference.get().unwrap(), None);

        // Retry clears the error
        h.controller.start(sink.clone()).await.unwrap();
        assert_eq!(h.controller.snapshot().error, None);
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_unsupported_platform_never_opens() {
        let h = phone();
        h.platform.set_capture_supported(false);

        let err = h.controller.start(VideoSink::new()).await.unwrap_err();
        assert_eq!(err.scan_error().unwrap().kind, ScanErrorKind::Unsupported);
        assert!(h.platform.opens().is_empty());
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_decoder_subscription_failure_releases_stream() {
        let h = phone();
        h.decoder
            .fail_next_subscribe(MediaFailure::from_name("NotSupportedError", "no worker"));

        let err = h.controller.start(VideoSink::new()).await.unwrap_err();
        assert_eq!(err.scan_error().unwrap().kind, ScanErrorKind::Unsupported);
        assert_eq!(h.platform.live_tracks(), 0);
        assert_eq!(h.controller.snapshot().status, ScanStatus::Idle);
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_fatal_decoder_fault_surfaces_unknown() {
        let h = phone();
        h.controller.start(VideoSink::new()).await.unwrap();

        h.decoder.latest().unwrap().push(DecodeOutcome::Fault {
            message: "wasm trap".into(),
            fatal: true,
        });
        drain().await;

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, ScanStatus::Idle);
        assert_eq!(snapshot.error.unwrap().kind, ScanErrorKind::Unknown);
        assert_eq!(h.platform.live_tracks(), 0);
        assert!(h.navigator.calls().is_empty());
        h.controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_acquisition_releases_late_stream() {
        let h = phone();
        h.platform.set_open_latency(Duration::from_millis(50));
        let controller = Arc::new(h.controller);

        let starting = controller.clone();
        let task = tokio::spawn(async move { starting.start(VideoSink::new()).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(controller.snapshot().status, ScanStatus::Starting);
        controller.stop().await;

        let result = task.await.unwrap();
        assert_eq!(result, Err(StartError::Superseded { generation: 1 }));
        assert_eq!(h.platform.live_tracks(), 0);
        assert_eq!(controller.snapshot().status, ScanStatus::Idle);
        assert_eq!(h.preference.get().unwrap(), None);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_stop_is_not_reported() {
        let h = phone();
        h.platform.set_open_latency(Duration::from_millis(50));
        h.platform
            .fail_next_open(MediaFailure::from_name("NotAllowedError", "Permission denied"));
        let controller = Arc::new(h.controller);

        let starting = controller.clone();
        let task = tokio::spawn(async move { starting.start(VideoSink::new()).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.stop().await;

        let result = task.await.unwrap();
        assert_eq!(result, Err(StartError::Superseded { generation: 1 }));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.status, ScanStatus::Idle);
        assert_eq!(snapshot.error, None);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_during_settle_delay_never_reopens() {
        let h = phone();
        h.controller.start(VideoSink::new()).await.unwrap();
        let controller = Arc::new(h.controller);

        let restarting = controller.clone();
        let task = tokio::spawn(async move { restarting.start(VideoSink::new()).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(controller.snapshot().status, ScanStatus::Starting);
        assert_eq!(h.platform.opens().len(), 1);
        controller.dispose().await;

        let result = task.await.unwrap();
        assert_eq!(result, Err(StartError::Disposed));
        assert_eq!(h.platform.opens().len(), 1);
        assert_eq!(h.platform.live_tracks(), 0);
        assert_eq!(controller.snapshot().status, ScanStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_settle_delay_cancels_restart() {
        let h = phone();
        h.controller.start(VideoSink::new()).await.unwrap();
        let controller = Arc::new(h.controller);

        let restarting = controller.clone();
        let task = tokio::spawn(async move { restarting.start(VideoSink::new()).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.stop().await;

        let result = task.await.unwrap();
        assert_eq!(result, Err(StartError::Superseded { generation: 2 }));
        assert_eq!(h.platform.opens().len(), 1);
        assert_eq!(h.platform.live_tracks(), 0);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_follows_superseded_release() {
        let h = phone();
        let open_latency = Duration::from_millis(50);
        h.platform.set_open_latency(open_latency);
        let controller = Arc::new(h.controller);

        let starting = controller.clone();
        let first = tokio::spawn(async move { starting.start(VideoSink::new()).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.stop().await;

        // Waits for the first start to release its late stream, then settles
        let before = Instant::now();
        let generation = controller.start(VideoSink::new()).await.unwrap();
        assert_eq!(generation, 2);
        assert!(
            before.elapsed() >= Duration::from_millis(DEFAULT_SETTLE_DELAY_MS) + open_latency
        );

        assert_eq!(
            first.await.unwrap(),
            Err(StartError::Superseded { generation: 1 })
        );

        let opens = h.platform.opens();
        assert_eq!(opens.len(), 2);
        assert_eq!(opens[1].live_before, 0);
        assert_eq!(h.platform.live_tracks(), 1);

        controller.dispose().await;
    }

    #[tokio::test]
    async fn test_dispose_is_final() {
        let h = phone();
        h.controller.start(VideoSink::new()).await.unwrap();

        h.controller.dispose().await;
        assert!(h.controller.is_disposed());
        assert_eq!(h.platform.live_tracks(), 0);

        let err = h.controller.start(VideoSink::new()).await.unwrap_err();
        assert_eq!(err, StartError::Disposed);
        assert_eq!(h.platform.opens().len(), 1);

        // Second dispose is harmless
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let h = phone();
        let mut rx = h.controller.subscribe();

        h.controller.start(VideoSink::new()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, ScanStatus::Active);

        h.controller.stop().await;
        assert_eq!(rx.borrow_and_update().status, ScanStatus::Idle);
        assert_eq!(h.platform.live_tracks(), 0);

        h.controller.dispose().await;
    }
}
