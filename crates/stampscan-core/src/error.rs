//! # Error Types
//!
//! Domain-specific error types for stampscan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stampscan-core errors (this file)                                     │
//! │  ├── ScanError          - Acquisition failures shown in the scanner UI │
//! │  ├── ResolutionFailure  - Decode/resolve failures, routed to failure   │
//! │  └── ValidationError    - Input validation failures                    │
//! │                                                                         │
//! │  stampscan-session errors (separate crate)                             │
//! │  └── SessionError       - Config, storage and channel failures         │
//! │                                                                         │
//! │  Flow: MediaFailure → classify() → ScanError → snapshot → host UI      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Acquisition errors are recoverable by retrying the scan. Resolution
//! failures are terminal for one scan attempt and never appear in the
//! scanner's error slot.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Scan Error
// =============================================================================

/// Category of an acquisition-time failure.
///
/// The set is closed: every low-level platform failure maps to exactly one
/// of these (see [`crate::classify`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ScanErrorKind {
    /// The user (or policy) refused camera access.
    PermissionDenied,
    /// The device has no usable camera.
    DeviceNotFound,
    /// The camera is held by another process.
    DeviceBusy,
    /// The platform does not expose media capture at all.
    Unsupported,
    /// Anything else.
    Unknown,
}

impl std::fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanErrorKind::PermissionDenied => write!(f, "permission_denied"),
            ScanErrorKind::DeviceNotFound => write!(f, "device_not_found"),
            ScanErrorKind::DeviceBusy => write!(f, "device_busy"),
            ScanErrorKind::Unsupported => write!(f, "unsupported"),
            ScanErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A classified acquisition failure carrying a displayable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
#[error("{message}")]
pub struct ScanError {
    /// Category used by the host UI to pick an icon or help link.
    pub kind: ScanErrorKind,

    /// Human-readable, multi-line message.
    pub message: String,
}

impl ScanError {
    /// Creates a scan error of the given kind.
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        ScanError {
            kind,
            message: message.into(),
        }
    }

    /// Returns true if retrying the scan can succeed without user action
    /// outside the app.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ScanErrorKind::DeviceBusy | ScanErrorKind::Unknown)
    }
}

// =============================================================================
// Resolution Failure
// =============================================================================

/// Why a decoded payload did not lead to a quiz.
///
/// All variants route to the failure destination; none is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    /// The decoded text is not one of our codes.
    #[error("Payload '{payload}' does not start with '{prefix}'")]
    PayloadRejected { payload: String, prefix: String },

    /// The resolver has no record for this key.
    #[error("No stamp registered for '{0}'")]
    ResolverNotFound(String),

    /// The resolver could not be reached or answered garbage.
    #[error("Resolver transport error: {0}")]
    ResolverTransportError(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result of a validation check.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
