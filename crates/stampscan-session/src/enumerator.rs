//! # Device Enumerator
//!
//! Lists the cameras the platform can see, in platform order.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use stampscan_core::{classify, DeviceDescriptor, MediaFailure, ScanError};

use crate::platform::{DeviceKind, MediaPlatform};

/// Why no device list could be produced.
///
/// The controller treats both cases as "open the camera unconstrained".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerationError {
    /// The platform listed no video inputs.
    #[error("No video input devices found")]
    NoDevices,

    /// The platform call itself failed.
    #[error("Device enumeration failed: {0}")]
    Platform(#[from] MediaFailure),
}

impl EnumerationError {
    /// The user-facing form, should the caller decide to surface it.
    pub fn to_scan_error(&self) -> ScanError {
        match self {
            EnumerationError::NoDevices => {
                classify(&MediaFailure::NotFound("no video input devices".to_string()))
            }
            EnumerationError::Platform(failure) => classify(failure),
        }
    }
}

/// Video-input lister over a [`MediaPlatform`].
#[derive(Clone)]
pub struct DeviceEnumerator {
    platform: Arc<dyn MediaPlatform>,
}

impl DeviceEnumerator {
    pub fn new(platform: Arc<dyn MediaPlatform>) -> Self {
        DeviceEnumerator { platform }
    }

    /// Lists video inputs. An empty list is an error.
    pub async fn list(&self) -> Result<Vec<DeviceDescriptor>, EnumerationError> {
        let all = self.platform.list_devices().await?;
        let total = all.len();

        let cameras: Vec<DeviceDescriptor> = all
            .into_iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .map(|d| DeviceDescriptor::new(d.id, d.label))
            .collect();

        debug!(total, cameras = cameras.len(), "Enumerated media devices");

        if cameras.is_empty() {
            return Err(EnumerationError::NoDevices);
        }
        Ok(cameras)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MediaDeviceInfo;
    use crate::simulator::SimulatedPlatform;
    use stampscan_core::ScanErrorKind;

    fn audio(id: &str) -> MediaDeviceInfo {
        MediaDeviceInfo {
            id: id.to_string(),
            label: "Microphone".to_string(),
            kind: DeviceKind::AudioInput,
        }
    }

    #[tokio::test]
    async fn test_keeps_video_inputs_in_order() {
        let platform = Arc::new(SimulatedPlatform::with_devices(vec![
            audio("mic"),
            MediaDeviceInfo::video("front", "Front Camera"),
            audio("mic-2"),
            MediaDeviceInfo::video("back", "Back Camera"),
        ]));

        let devices = DeviceEnumerator::new(platform).list().await.unwrap();
        let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["front", "back"]);
    }

    #[tokio::test]
    async fn test_no_cameras_is_device_not_found() {
        let platform = Arc::new(SimulatedPlatform::with_devices(vec![audio("mic")]));

        let err = DeviceEnumerator::new(platform).list().await.unwrap_err();
        assert_eq!(err, EnumerationError::NoDevices);
        assert_eq!(err.to_scan_error().kind, ScanErrorKind::DeviceNotFound);
    }

    #[tokio::test]
    async fn test_platform_failure_is_surfaced() {
        let platform = Arc::new(SimulatedPlatform::with_devices(vec![MediaDeviceInfo::video(
            "cam", "Camera",
        )]));
        platform.fail_next_listing(MediaFailure::from_name("SecurityError", "insecure context"));

        let enumerator = DeviceEnumerator::new(platform);
        let err = enumerator.list().await.unwrap_err();
        assert!(matches!(err, EnumerationError::Platform(_)));
        assert_eq!(err.to_scan_error().kind, ScanErrorKind::PermissionDenied);

        // One-shot failure
        assert_eq!(enumerator.list().await.unwrap().len(), 1);
    }
}
