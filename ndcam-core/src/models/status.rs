use thiserror::Error;

/// Failure codes reported by the platform camera stack.
///
/// Backends translate their native status values into this enum; the core
/// then maps them onto `CameraError` kinds at its boundary.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformStatus {
    #[error("camera operation failed due to an unspecified cause")]
    Unknown,

    #[error("camera operation received an invalid parameter")]
    InvalidParameter,

    #[error("camera device has been closed or taken over by a higher-priority client")]
    CameraDisconnected,

    #[error("camera operation ran out of memory")]
    NotEnoughMemory,

    #[error("requested metadata tag was not found")]
    MetadataNotFound,

    #[error("camera device encountered a fatal error and must be re-opened")]
    CameraDevice,

    #[error("camera service encountered a fatal error")]
    CameraService,

    #[error("capture session has been closed")]
    SessionClosed,

    #[error("invalid internal operation, may resolve on retry")]
    InvalidOperation,

    #[error("camera does not support the requested stream configuration")]
    StreamConfigureFail,

    #[error("camera is in use by a higher-priority client")]
    CameraInUse,

    #[error("system-wide limit of open cameras reached")]
    MaxCameraInUse,

    #[error("camera disabled by device policy")]
    CameraDisabled,

    #[error("no permission to open camera")]
    PermissionDenied,
}

impl PlatformStatus {
    /// Whether the device connection is gone and must be re-opened.
    pub fn is_device_lost(&self) -> bool {
        matches!(
            self,
            Self::CameraDisconnected | Self::CameraDevice | Self::CameraService | Self::PermissionDenied
        )
    }
}
