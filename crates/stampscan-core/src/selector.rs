//! # Camera Selector
//!
//! Picks which physical camera a scan session should open.
//!
//! ## Decision Order (first match wins)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Camera Selection                                   │
//! │                                                                         │
//! │  1. Stored preference still present?  ──yes──►  Stored                 │
//! │           │ no                                                          │
//! │           ▼                                                             │
//! │  2. Label looks rear-facing?          ──yes──►  LabelHint (first match)│
//! │           │ no                                                          │
//! │           ▼                                                             │
//! │  3. Any device at all?                ──yes──►  FirstAvailable         │
//! │           │ no                                                          │
//! │           ▼                                                             │
//! │  4. Unconstrained (platform decides)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A cached id beats heuristics because platform labels are unreliable; the
//! label hints are only a proxy for "rear-facing" on a first run.

use crate::types::DeviceDescriptor;

/// Label fragments that suggest a rear-facing camera. Compared lowercase.
pub const BACK_CAMERA_HINTS: &[&str] = &[
    "back",
    "environment",
    "video device 1",
    "背面",
    "リアカメラ",
];

/// Why a device was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// The stored preference matched a live device.
    Stored,
    /// A label matched [`BACK_CAMERA_HINTS`].
    LabelHint,
    /// Fallback to the first enumerated device.
    FirstAvailable,
    /// No devices enumerated; let the platform choose.
    Unconstrained,
}

impl std::fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionSource::Stored => write!(f, "stored"),
            SelectionSource::LabelHint => write!(f, "label_hint"),
            SelectionSource::FirstAvailable => write!(f, "first_available"),
            SelectionSource::Unconstrained => write!(f, "unconstrained"),
        }
    }
}

/// Result of [`select_camera`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSelection {
    /// The chosen device, or `None` to open the camera without a constraint.
    pub device: Option<DeviceDescriptor>,

    /// Which rule produced the choice.
    pub source: SelectionSource,

    /// A stored id was given but is not in the current device list. The
    /// caller should clear the preference.
    pub stale_preference: bool,
}

impl CameraSelection {
    /// The device id to request, if any.
    pub fn device_id(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.id.as_str())
    }
}

/// Returns true if the label suggests a rear-facing camera.
pub fn looks_rear_facing(label: &str) -> bool {
    let label = label.to_lowercase();
    BACK_CAMERA_HINTS.iter().any(|hint| label.contains(hint))
}

/// Chooses a camera from `devices`, preferring `stored_id`.
///
/// ## Example
/// ```rust
/// use stampscan_core::selector::{select_camera, SelectionSource};
/// use stampscan_core::DeviceDescriptor;
///
/// let devices = vec![
///     DeviceDescriptor::new("f", "Front Camera"),
///     DeviceDescriptor::new("b", "Back Camera"),
/// ];
/// let picked = select_camera(&devices, None);
/// assert_eq!(picked.device_id(), Some("b"));
/// assert_eq!(picked.source, SelectionSource::LabelHint);
/// ```
pub fn select_camera(devices: &[DeviceDescriptor], stored_id: Option<&str>) -> CameraSelection {
    let mut stale_preference = false;

    if let Some(stored) = stored_id.filter(|id| !id.is_empty()) {
        if let Some(device) = devices.iter().find(|d| d.id == stored) {
            return CameraSelection {
                device: Some(device.clone()),
                source: SelectionSource::Stored,
                stale_preference: false,
            };
        }
        stale_preference = true;
    }

    let (device, source) = match devices.iter().find(|d| looks_rear_facing(&d.label)) {
        Some(device) => (Some(device.clone()), SelectionSource::LabelHint),
        None => match devices.first() {
            Some(device) => (Some(device.clone()), SelectionSource::FirstAvailable),
            None => (None, SelectionSource::Unconstrained),
        },
    };

    CameraSelection {
        device,
        source,
        stale_preference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices(labels: &[(&str, &str)]) -> Vec<DeviceDescriptor> {
        labels
            .iter()
            .map(|(id, label)| DeviceDescriptor::new(*id, *label))
            .collect()
    }

    #[test]
    fn test_stored_id_bypasses_heuristics() {
        let list = devices(&[("cam-1", "Back Camera"), ("cam-42", "Front Camera")]);
        let picked = select_camera(&list, Some("cam-42"));
        assert_eq!(picked.device_id(), Some("cam-42"));
        assert_eq!(picked.source, SelectionSource::Stored);
        assert!(!picked.stale_preference);
    }

    #[test]
    fn test_label_hint_picks_back_camera() {
        let list = devices(&[("f", "Front Camera"), ("b", "Back Camera")]);
        let picked = select_camera(&list, None);
        assert_eq!(picked.device.unwrap().label, "Back Camera");
    }

    #[test]
    fn test_first_label_match_in_list_order() {
        let list = devices(&[
            ("a", "USB Webcam"),
            ("b", "camera2 0, facing environment"),
            ("c", "Back Triple Camera"),
        ]);
        assert_eq!(select_camera(&list, None).device_id(), Some("b"));
    }

    #[test]
    fn test_fallback_to_first_device() {
        let list = devices(&[("a", "Camera A"), ("b", "Camera B")]);
        let picked = select_camera(&list, None);
        assert_eq!(picked.device.unwrap().label, "Camera A");
        assert_eq!(picked.source, SelectionSource::FirstAvailable);
    }

    #[test]
    fn test_empty_list_is_unconstrained() {
        let picked = select_camera(&[], Some("cam-1"));
        assert!(picked.device.is_none());
        assert_eq!(picked.source, SelectionSource::Unconstrained);
        assert!(picked.stale_preference);
    }

    #[test]
    fn test_stale_preference_falls_through_to_heuristics() {
        let list = devices(&[("x", "Front"), ("y", "Rear: back")]);
        let picked = select_camera(&list, Some("gone"));
        assert!(picked.stale_preference);
        assert_eq!(picked.device_id(), Some("y"));
    }

    #[test]
    fn test_locale_hints_and_case() {
        assert!(looks_rear_facing("背面カメラ"));
        assert!(looks_rear_facing("リアカメラ"));
        assert!(looks_rear_facing("BACK"));
        assert!(looks_rear_facing("Video Device 1"));
        assert!(!looks_rear_facing("Integrated Webcam"));
        assert!(!looks_rear_facing(""));
    }

    #[test]
    fn test_empty_stored_id_is_ignored() {
        let list = devices(&[("a", "Camera A")]);
        let picked = select_camera(&list, Some(""));
        assert!(!picked.stale_preference);
        assert_eq!(picked.source, SelectionSource::FirstAvailable);
    }
}
