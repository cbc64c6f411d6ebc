//! # Simulated Platform
//!
//! A scriptable, in-process camera platform and decoder for tests and the
//! kiosk harness.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Simulated Camera Stack                             │
//! │                                                                         │
//! │  SimulatedPlatform                                                      │
//! │  ├── devices (all kinds)         set_devices / with_devices            │
//! │  ├── capability flag             set_capture_supported                 │
//! │  ├── one-shot failures           fail_next_listing / fail_next_open    │
//! │  ├── requested → granted map     substitute                            │
//! │  ├── exclusive hardware          opening while tracks are live fails   │
//! │  └── open log                    opens() / live_tracks()               │
//! │                                                                         │
//! │  ScriptedDecoder                                                        │
//! │  └── one FrameFeed per subscription; push frames into the latest       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use stampscan_core::{DecodeOutcome, MediaFailure};

use crate::platform::{
    DecodeStream, DeviceKind, FrameDecoder, MediaDeviceInfo, MediaPlatform, MediaStream,
    SharedStream,
};

// =============================================================================
// Stream
// =============================================================================

/// A simulated capture stream holding a single video track.
#[derive(Debug)]
pub struct SimulatedStream {
    device_id: Option<String>,
    live: AtomicBool,
    hardware: Arc<AtomicUsize>,
}

impl MediaStream for SimulatedStream {
    fn actual_device_id(&self) -> Option<String> {
        self.device_id.clone()
    }

    fn stop_all_tracks(&self) -> Result<(), MediaFailure> {
        if self.live.swap(false, Ordering::SeqCst) {
            self.hardware.fetch_sub(1, Ordering::SeqCst);
            debug!(device_id = ?self.device_id, "Simulated track stopped");
        }
        Ok(())
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.live.load(Ordering::SeqCst))
    }
}

// =============================================================================
// Platform
// =============================================================================

/// One `open_stream` call as seen by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRecord {
    pub requested: Option<String>,
    pub granted: Option<String>,
    /// Tracks still live elsewhere when the call arrived.
    pub live_before: usize,
}

#[derive(Debug)]
struct PlatformScript {
    devices: Vec<MediaDeviceInfo>,
    capture_supported: bool,
    exclusive: bool,
    listing_failure: Option<MediaFailure>,
    open_failures: VecDeque<MediaFailure>,
    substitutions: HashMap<String, String>,
    open_latency: Option<Duration>,
    opens: Vec<OpenRecord>,
}

/// Scriptable [`MediaPlatform`].
#[derive(Debug)]
pub struct SimulatedPlatform {
    script: Mutex<PlatformScript>,
    hardware: Arc<AtomicUsize>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        SimulatedPlatform {
            script: Mutex::new(PlatformScript {
                devices: Vec::new(),
                capture_supported: true,
                exclusive: true,
                listing_failure: None,
                open_failures: VecDeque::new(),
                substitutions: HashMap::new(),
                open_latency: None,
                opens: Vec::new(),
            }),
            hardware: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SimulatedPlatform {
    /// A platform with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform listing `devices`.
    pub fn with_devices(devices: Vec<MediaDeviceInfo>) -> Self {
        let platform = Self::default();
        platform.set_devices(devices);
        platform
    }

    /// A platform with one video input per `(id, label)` pair.
    pub fn with_cameras(cameras: &[(&str, &str)]) -> Self {
        Self::with_devices(
            cameras
                .iter()
                .map(|(id, label)| MediaDeviceInfo::video(*id, *label))
                .collect(),
        )
    }

    fn script(&self) -> std::sync::MutexGuard<'_, PlatformScript> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_devices(&self, devices: Vec<MediaDeviceInfo>) {
        self.script().devices = devices;
    }

    pub fn set_capture_supported(&self, supported: bool) {
        self.script().capture_supported = supported;
    }

    /// When false, a second stream may open while another is live.
    pub fn set_exclusive(&self, exclusive: bool) {
        self.script().exclusive = exclusive;
    }

    /// Fails the next `list_devices` call.
    pub fn fail_next_listing(&self, failure: MediaFailure) {
        self.script().listing_failure = Some(failure);
    }

    /// Queues a failure for the next `open_stream` call.
    pub fn fail_next_open(&self, failure: MediaFailure) {
        self.script().open_failures.push_back(failure);
    }

    /// Grants `granted` whenever `requested` is asked for.
    pub fn substitute(&self, requested: impl Into<String>, granted: impl Into<String>) {
        self.script()
            .substitutions
            .insert(requested.into(), granted.into());
    }

    /// Makes `open_stream` suspend for `latency` before answering.
    pub fn set_open_latency(&self, latency: Duration) {
        self.script().open_latency = Some(latency);
    }

    /// Every `open_stream` call so far.
    pub fn opens(&self) -> Vec<OpenRecord> {
        self.script().opens.clone()
    }

    /// Tracks currently holding hardware across all streams.
    pub fn live_tracks(&self) -> usize {
        self.hardware.load(Ordering::SeqCst)
    }

    fn grant(&self, requested: Option<&str>) -> Result<SharedStream, MediaFailure> {
        let mut script = self.script();
        let live_before = self.hardware.load(Ordering::SeqCst);

        let granted = match requested {
            Some(id) => match script.substitutions.get(id) {
                Some(sub) => Some(sub.clone()),
                None if script.devices.iter().any(|d| d.id == id) => Some(id.to_string()),
                None => None,
            },
            None => script
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::VideoInput)
                .map(|d| d.id.clone()),
        };

        script.opens.push(OpenRecord {
            requested: requested.map(str::to_string),
            granted: granted.clone(),
            live_before,
        });

        if let Some(failure) = script.open_failures.pop_front() {
            return Err(failure);
        }

        if script.exclusive && live_before > 0 {
            return Err(MediaFailure::from_name(
                "NotReadableError",
                "Could not start video source",
            ));
        }

        let granted = match (requested, granted) {
            (_, Some(id)) => id,
            (Some(id), None) => {
                return Err(MediaFailure::from_name(
                    "OverconstrainedError",
                    format!("no device matches id {id}"),
                ))
            }
            (None, None) => {
                return Err(MediaFailure::from_name(
                    "NotFoundError",
                    "Requested device not found",
                ))
            }
        };

        self.hardware.fetch_add(1, Ordering::SeqCst);
        debug!(requested = ?requested, granted = %granted, "Simulated stream opened");

        Ok(Arc::new(SimulatedStream {
            device_id: Some(granted),
            live: AtomicBool::new(true),
            hardware: self.hardware.clone(),
        }))
    }
}

#[async_trait]
impl MediaPlatform for SimulatedPlatform {
    fn supports_capture(&self) -> bool {
        self.script().capture_supported
    }

    async fn list_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaFailure> {
        let mut script = self.script();
        if let Some(failure) = script.listing_failure.take() {
            return Err(failure);
        }
        Ok(script.devices.clone())
    }

    async fn open_stream(&self, device_id: Option<&str>) -> Result<SharedStream, MediaFailure> {
        let latency = self.script().open_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.grant(device_id)
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Pushes frames into one decoder subscription.
#[derive(Debug, Clone)]
pub struct FrameFeed {
    tx: mpsc::UnboundedSender<DecodeOutcome>,
}

impl FrameFeed {
    /// Sends a frame. Returns false if the subscription is gone.
    pub fn push(&self, outcome: DecodeOutcome) -> bool {
        self.tx.send(outcome).is_ok()
    }

    pub fn decoded(&self, text: &str) -> bool {
        self.push(DecodeOutcome::decoded(text))
    }

    pub fn no_result(&self) -> bool {
        self.push(DecodeOutcome::NoResult)
    }

    /// Returns true once the subscriber dropped its stream.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Scriptable [`FrameDecoder`].
#[derive(Debug, Default)]
pub struct ScriptedDecoder {
    feeds: Mutex<Vec<FrameFeed>>,
    subscribe_failure: Mutex<Option<MediaFailure>>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `subscribe` call.
    pub fn fail_next_subscribe(&self, failure: MediaFailure) {
        *self.subscribe_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(failure);
    }

    /// Number of subscriptions made so far.
    pub fn subscriptions(&self) -> usize {
        self.feeds.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Feed of the `index`-th subscription.
    pub fn feed(&self, index: usize) -> Option<FrameFeed> {
        self.feeds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    /// Feed of the most recent subscription.
    pub fn latest(&self) -> Option<FrameFeed> {
        self.feeds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn subscribe(&self, stream: SharedStream) -> Result<DecodeStream, MediaFailure> {
        if let Some(failure) = self
            .subscribe_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(failure);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut feeds = self.feeds.lock().unwrap_or_else(|e| e.into_inner());
        feeds.push(FrameFeed { tx });
        debug!(
            subscription = feeds.len(),
            device_id = ?stream.actual_device_id(),
            "Decoder subscribed"
        );

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
