//! # Platform Seams
//!
//! The narrow surface the session engine needs from the host platform.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Platform Surface                                   │
//! │                                                                         │
//! │  MediaPlatform                                                          │
//! │  ├── supports_capture()          capability check (HTTPS, API present) │
//! │  ├── list_devices()        async all media devices, platform order     │
//! │  └── open_stream(id?)      async camera stream, constrained or not     │
//! │                                                                         │
//! │  MediaStream                                                            │
//! │  ├── actual_device_id()          what the platform really bound        │
//! │  ├── stop_all_tracks()           releases the hardware                 │
//! │  └── live_tracks()                                                      │
//! │                                                                         │
//! │  FrameDecoder                                                           │
//! │  └── subscribe(stream)           lazy per-frame DecodeOutcome stream   │
//! │                                                                         │
//! │  VideoSink                       host-owned slot the stream renders in │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::sync::{Arc, Mutex};

use stampscan_core::{DecodeOutcome, MediaFailure};

// =============================================================================
// Devices
// =============================================================================

/// Kind of a media device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// A media device as the platform lists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl MediaDeviceInfo {
    /// A camera.
    pub fn video(id: impl Into<String>, label: impl Into<String>) -> Self {
        MediaDeviceInfo {
            id: id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }
}

// =============================================================================
// Streams
// =============================================================================

/// A live capture stream.
pub trait MediaStream: Send + Sync {
    /// Device id from the live video track's settings.
    fn actual_device_id(&self) -> Option<String>;

    /// Stops every track. Stopping an already stopped stream is a no-op.
    fn stop_all_tracks(&self) -> Result<(), MediaFailure>;

    /// Number of tracks still holding hardware.
    fn live_tracks(&self) -> usize;
}

/// Shared handle to a capture stream.
pub type SharedStream = Arc<dyn MediaStream>;

/// Host media API.
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Returns false when capture is unavailable altogether.
    fn supports_capture(&self) -> bool;

    /// Lists every media device.
    async fn list_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaFailure>;

    /// Opens a camera. `None` lets the platform choose.
    async fn open_stream(&self, device_id: Option<&str>) -> Result<SharedStream, MediaFailure>;
}

// =============================================================================
// Decoder
// =============================================================================

/// Per-frame decode attempts for one session.
///
/// Lazy, unbounded and not restartable. Dropping it unsubscribes.
pub type DecodeStream = BoxStream<'static, DecodeOutcome>;

/// External QR decoder.
pub trait FrameDecoder: Send + Sync {
    /// Starts decoding frames from `stream`.
    fn subscribe(&self, stream: SharedStream) -> Result<DecodeStream, MediaFailure>;
}

// =============================================================================
// Video Sink
// =============================================================================

/// Rendering target supplied by the host UI.
///
/// The engine writes the current stream into the slot; the host renders
/// whatever is there.
#[derive(Clone, Default)]
pub struct VideoSink {
    slot: Arc<Mutex<Option<SharedStream>>>,
}

impl VideoSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `stream` in the slot, returning the previous occupant.
    pub fn bind(&self, stream: SharedStream) -> Option<SharedStream> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.replace(stream)
    }

    /// Empties the slot.
    pub fn unbind(&self) -> Option<SharedStream> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }

    /// The stream currently bound, if any.
    pub fn current(&self) -> Option<SharedStream> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }

    /// Returns true if a stream is bound.
    pub fn is_bound(&self) -> bool {
        self.current().is_some()
    }
}

impl std::fmt::Debug for VideoSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSink")
            .field("bound", &self.is_bound())
            .finish()
    }
}
