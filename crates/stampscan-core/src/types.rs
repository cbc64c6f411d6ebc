//! # Domain Types
//!
//! Core types shared between the session engine and the host UI.
//!
//! ## Session State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scan Session Lifecycle                             │
//! │                                                                         │
//! │  ┌────────┐   begin()    ┌──────────┐   activate()   ┌────────┐        │
//! │  │  Idle  │ ───────────► │ Starting │ ─────────────► │ Active │        │
//! │  └────────┘              └────┬─────┘                └───┬────┘        │
//! │      ▲                        │                          │             │
//! │      │        fail(err)       │                          │ stopping()  │
//! │      ├────────────────────────┘                          ▼             │
//! │      │                                            ┌──────────┐         │
//! │      └─────────────── idle() ─────────────────────│ Stopping │         │
//! │                                                   └──────────┘         │
//! │                                                                         │
//! │  generation: +1 on every begin(), never otherwise                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transitions are pure: each returns a new [`SessionSnapshot`] and leaves
//! the receiver untouched. The session engine publishes the result to
//! subscribers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ScanError;

// =============================================================================
// Device Descriptor
// =============================================================================

/// A video-input device as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeviceDescriptor {
    /// Opaque platform identifier. Stable across restarts on most platforms.
    pub id: String,

    /// Human-readable label. May be empty before permission is granted.
    pub label: String,
}

impl DeviceDescriptor {
    /// Creates a descriptor.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        DeviceDescriptor {
            id: id.into(),
            label: label.into(),
        }
    }
}

// =============================================================================
// Scan Status
// =============================================================================

/// Lifecycle status of the scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ScanStatus {
    /// No camera held.
    #[default]
    Idle,
    /// Acquiring the camera.
    Starting,
    /// Camera open, decoding frames.
    Active,
    /// Releasing the camera.
    Stopping,
}

impl ScanStatus {
    /// Returns true if the session holds, or is about to hold, the camera.
    pub fn is_live(&self) -> bool {
        matches!(self, ScanStatus::Starting | ScanStatus::Active)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Idle => write!(f, "idle"),
            ScanStatus::Starting => write!(f, "starting"),
            ScanStatus::Active => write!(f, "active"),
            ScanStatus::Stopping => write!(f, "stopping"),
        }
    }
}

// =============================================================================
// Session Snapshot
// =============================================================================

/// Observable state of one scanner instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionSnapshot {
    /// Incremented on every start request.
    pub generation: u64,

    /// Current lifecycle status.
    pub status: ScanStatus,

    /// Camera picked for the current (or last) session, for diagnostics.
    pub device: Option<DeviceDescriptor>,

    /// Message from the last failed start, cleared by the next one.
    pub error: Option<ScanError>,
}

impl SessionSnapshot {
    /// Starts a new generation. Clears any previous error.
    pub fn begin(&self) -> Self {
        SessionSnapshot {
            generation: self.generation + 1,
            status: ScanStatus::Starting,
            device: None,
            error: None,
        }
    }

    /// Marks the camera as open.
    pub fn activate(&self, device: Option<DeviceDescriptor>) -> Self {
        SessionSnapshot {
            status: ScanStatus::Active,
            device,
            ..self.clone()
        }
    }

    /// Marks the camera as being released.
    pub fn stopping(&self) -> Self {
        SessionSnapshot {
            status: ScanStatus::Stopping,
            ..self.clone()
        }
    }

    /// Returns to idle, keeping the generation and last device.
    pub fn idle(&self) -> Self {
        SessionSnapshot {
            status: ScanStatus::Idle,
            ..self.clone()
        }
    }

    /// Returns to idle with a displayable error.
    pub fn fail(&self, error: ScanError) -> Self {
        SessionSnapshot {
            status: ScanStatus::Idle,
            error: Some(error),
            ..self.clone()
        }
    }

    /// Returns true if this snapshot belongs to `generation`.
    pub fn is_generation(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

// =============================================================================
// Decode Outcome
// =============================================================================

/// One per-frame result from the external decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A code was read.
    Decoded { text: String },

    /// No code visible in this frame. Not an error.
    NoResult,

    /// The decoder reported a fault. `fatal` means the decoder itself died
    /// and no further frames will arrive.
    Fault { message: String, fatal: bool },
}

impl DecodeOutcome {
    /// Convenience constructor for a decoded frame.
    pub fn decoded(text: impl Into<String>) -> Self {
        DecodeOutcome::Decoded { text: text.into() }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
