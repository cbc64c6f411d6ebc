//! # Error Classifier
//!
//! Maps raw media-capture failures onto the closed [`ScanErrorKind`] set and
//! attaches the message the scanner screen shows.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Platform error name                  MediaFailure      ScanErrorKind   │
//! │  ───────────────────────────────────  ───────────────   ─────────────── │
//! │  NotAllowedError, SecurityError,      NotAllowed        PermissionDenied│
//! │  PermissionDeniedError                                                  │
//! │  NotFoundError, DevicesNotFoundError, NotFound          DeviceNotFound  │
//! │  OverconstrainedError                                                   │
//! │  NotReadableError, TrackStartError    NotReadable       DeviceBusy      │
//! │  NotSupportedError, TypeError         Unsupported       Unsupported     │
//! │  anything else                        Other             Unknown         │
//! │  (no error identity at all)           Opaque            Unknown         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::error::{ScanError, ScanErrorKind};

// =============================================================================
// Messages
// =============================================================================

/// Shown when camera permission was refused.
pub const MSG_PERMISSION_DENIED: &str = "Camera access is not allowed.\n\
    Open your browser or device settings and allow camera access for this site.";

/// Shown when no camera exists.
pub const MSG_DEVICE_NOT_FOUND: &str =
    "No camera was found.\nPlease check that your device has a camera.";

/// Shown when another app holds the camera.
pub const MSG_DEVICE_BUSY: &str =
    "The camera is in use.\nClose any other app that is using the camera and try again.";

/// Shown when capture is unavailable (old browser or plain HTTP).
pub const MSG_UNSUPPORTED: &str = "Your browser does not support the camera, \
    or the page was not opened over HTTPS.\nCamera access requires a secure connection.";

/// Generic failure.
pub const MSG_UNKNOWN: &str = "The camera could not be started.\nPlease wait a moment and try again.";

/// Failure without any error identity.
pub const MSG_OPAQUE: &str = "The camera could not be started.\nPlease reload the page and try again.";

/// Decoder stopped producing frames.
pub const MSG_DECODER_STOPPED: &str = "Scanning stopped unexpectedly.\nPlease try again.";

// =============================================================================
// Media Failure
// =============================================================================

/// A raw failure reported by the platform media layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFailure {
    /// Access refused by the user or a policy.
    NotAllowed(String),
    /// No matching hardware.
    NotFound(String),
    /// Hardware exists but cannot be read (usually claimed elsewhere).
    NotReadable(String),
    /// The capture API is absent.
    Unsupported(String),
    /// Named failure we have no category for.
    Other { name: String, message: String },
    /// The platform threw something that is not an error object.
    Opaque,
}

impl MediaFailure {
    /// Builds a failure from a platform error name (DOMException style).
    pub fn from_name(name: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                MediaFailure::NotAllowed(message)
            }
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => {
                MediaFailure::NotFound(message)
            }
            "NotReadableError" | "TrackStartError" => MediaFailure::NotReadable(message),
            "NotSupportedError" | "TypeError" => MediaFailure::Unsupported(message),
            other => MediaFailure::Other {
                name: other.to_string(),
                message,
            },
        }
    }
}

impl fmt::Display for MediaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaFailure::NotAllowed(m) => write!(f, "NotAllowedError: {}", m),
            MediaFailure::NotFound(m) => write!(f, "NotFoundError: {}", m),
            MediaFailure::NotReadable(m) => write!(f, "NotReadableError: {}", m),
            MediaFailure::Unsupported(m) => write!(f, "NotSupportedError: {}", m),
            MediaFailure::Other { name, message } => write!(f, "{}: {}", name, message),
            MediaFailure::Opaque => write!(f, "opaque failure"),
        }
    }
}

impl std::error::Error for MediaFailure {}

// =============================================================================
// Classification
// =============================================================================

/// Classifies a raw failure into a displayable [`ScanError`].
pub fn classify(failure: &MediaFailure) -> ScanError {
    match failure {
        MediaFailure::NotAllowed(_) => {
            ScanError::new(ScanErrorKind::PermissionDenied, MSG_PERMISSION_DENIED)
        }
        MediaFailure::NotFound(_) => ScanError::new(ScanErrorKind::DeviceNotFound, MSG_DEVICE_NOT_FOUND),
        MediaFailure::NotReadable(_) => ScanError::new(ScanErrorKind::DeviceBusy, MSG_DEVICE_BUSY),
        MediaFailure::Unsupported(_) => unsupported(),
        MediaFailure::Other { .. } => ScanError::new(ScanErrorKind::Unknown, MSG_UNKNOWN),
        MediaFailure::Opaque => ScanError::new(ScanErrorKind::Unknown, MSG_OPAQUE),
    }
}

/// The error for a platform without capture support.
pub fn unsupported() -> ScanError {
    ScanError::new(ScanErrorKind::Unsupported, MSG_UNSUPPORTED)
}

/// The error for a decoder that died mid-session.
pub fn decoder_stopped() -> ScanError {
    ScanError::new(ScanErrorKind::Unknown, MSG_DECODER_STOPPED)
}
