use std::sync::Arc;

use crate::models::device::{Device, DeviceId};
use crate::models::request::CaptureRequest;
use crate::models::status::PlatformStatus;

use super::capture_callbacks::{CaptureCallbacks, DeviceCallbacks};

/// Interface to the platform camera stack.
///
/// Implemented by:
/// - `VirtualCameraPlatform` (ndcam-virtual)
pub trait CameraPlatform: Send + Sync {
    /// Whether the process holds camera authorization.
    fn has_permission(&self) -> bool;

    /// Bring up the camera subsystem. May be called again after `shutdown`.
    fn initialize(&self) -> Result<(), PlatformStatus>;

    /// List the cameras currently known to the platform.
    fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformStatus>;

    /// Open a connection to one camera.
    ///
    /// `callbacks` receives disconnect and fatal error notifications for the
    /// lifetime of the connection.
    fn open_device(
        &self,
        id: DeviceId,
        callbacks: Arc<dyn DeviceCallbacks>,
    ) -> Result<Box<dyn PlatformDevice>, PlatformStatus>;

    /// Release the camera subsystem.
    fn shutdown(&self) {}
}

/// An opened camera connection.
pub trait PlatformDevice: Send {
    /// Submit a capture request. Returns as soon as the request is queued;
    /// progress is reported through `callbacks`.
    fn submit(
        &mut self,
        request: &CaptureRequest,
        callbacks: Arc<dyn CaptureCallbacks>,
    ) -> Result<(), PlatformStatus>;

    /// Ask the active repeating sequence to end after its current frame.
    /// The end is reported through `on_sequence_completed`.
    fn stop_repeating(&mut self) -> Result<(), PlatformStatus>;

    /// Discard every in-flight request as fast as possible.
    /// Reported through `on_sequence_aborted`.
    fn abort_captures(&mut self) -> Result<(), PlatformStatus>;

    /// Release the connection. No callbacks are invoked after this returns.
    fn close(&mut self);
}
