//! # stampscan-core: Pure Scanner Logic
//!
//! Decision logic for the stamp rally scanner with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stamp Scanner Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Host UI (scanner screen)                     │   │
//! │  │      video element ──► error banner ──► quiz page              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ snapshots / navigation               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              stampscan-session (async engine)                   │   │
//! │  │    ScanController, DecodeDispatcher, OutcomeRouter, stores      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stampscan-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────┐ │   │
//! │  │   │  types   │ │ selector │ │ classify │ │validation│ │ quiz │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘ └──────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CAMERA • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Devices, session snapshots, decode outcomes
//! - [`selector`] - Which camera to open
//! - [`classify`] - Raw media failures to user-facing errors
//! - [`validation`] - Payload prefix and config checks
//! - [`quiz`] - Stamp records and the answer gate
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stampscan_core::classify::{classify, MediaFailure};
//! use stampscan_core::ScanErrorKind;
//!
//! let err = classify(&MediaFailure::from_name("NotReadableError", "Could not start video source"));
//! assert_eq!(err.kind, ScanErrorKind::DeviceBusy);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod classify;
pub mod error;
pub mod quiz;
pub mod selector;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use classify::{classify, MediaFailure};
pub use error::{ResolutionFailure, ScanError, ScanErrorKind, ValidationError, ValidationResult};
pub use quiz::{AnswerVerdict, QuizCard, QuizDto, StampRecord};
pub use selector::{select_camera, CameraSelection, SelectionSource};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Storage key under which the last negotiated camera id is kept.
pub const PREFERRED_CAMERA_KEY: &str = "preferredBackCameraId";

/// Pause between releasing a camera and opening one again.
///
/// Many platforms fail acquisition if the hardware is reopened immediately
/// after its tracks were stopped.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
