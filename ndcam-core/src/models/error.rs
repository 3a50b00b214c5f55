use std::time::Duration;

use thiserror::Error;

use super::device::{DeviceId, StreamTarget};
use super::request::CaptureFailure;
use super::state::SessionState;
use super::status::PlatformStatus;

/// Errors surfaced by the registry, device handles and capture sessions.
///
/// "No device", "device busy" and "session busy" are distinct variants so
/// callers can react to each without string matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera subsystem unavailable: {0}")]
    SubsystemUnavailable(String),

    #[error("camera subsystem not initialized")]
    NotInitialized,

    #[error("no camera devices found")]
    NoDevicesFound,

    #[error("invalid device id {0}")]
    InvalidDevice(DeviceId),

    #[error("device {0} is already open")]
    DeviceBusy(DeviceId),

    #[error("device {id} unavailable: {status}")]
    DeviceUnavailable { id: DeviceId, status: PlatformStatus },

    #[error("device {0} is closed")]
    DeviceClosed(DeviceId),

    #[error("session busy: currently {0}")]
    SessionBusy(SessionState),

    #[error("stream {0} is not supported by the device")]
    UnsupportedStream(StreamTarget),

    #[error("capture request failed: {0}")]
    RequestFailed(PlatformStatus),

    #[error("capture failed: {0}")]
    CaptureFailed(CaptureFailure),

    #[error("close did not observe the end of the in-flight sequence within {0:?}")]
    CloseTimedOut(Duration),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl CameraError {
    /// Error for a platform status reported while talking to an open device.
    pub(crate) fn from_device_status(id: DeviceId, status: PlatformStatus) -> Self {
        if status.is_device_lost() {
            Self::DeviceUnavailable { id, status }
        } else {
            Self::RequestFailed(status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_status_mapping() {
        let id = DeviceId(0);
        assert_eq!(
            CameraError::from_device_status(id, PlatformStatus::CameraDisconnected),
            CameraError::DeviceUnavailable {
                id,
                status: PlatformStatus::CameraDisconnected
            }
        );
        assert_eq!(
            CameraError::from_device_status(id, PlatformStatus::InvalidOperation),
            CameraError::RequestFailed(PlatformStatus::InvalidOperation)
        );
    }

    #[test]
    fn busy_kinds_are_distinct() {
        let device_busy = CameraError::DeviceBusy(DeviceId(1));
        let session_busy = CameraError::SessionBusy(SessionState::Repeating);
        assert_ne!(device_busy, session_busy);
        assert_ne!(device_busy, CameraError::NoDevicesFound);
        assert_eq!(session_busy.to_string(), "session busy: currently repeating");
    }
}
