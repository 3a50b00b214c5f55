use crate::models::device::DeviceId;
use crate::models::frame::Frame;
use crate::models::request::{CaptureFailure, RequestId};
use crate::models::status::PlatformStatus;

/// Per-request notifications from the platform's capture pipeline.
///
/// Implementations receive these on the platform's own execution context.
/// Platforms must never invoke them synchronously from inside `submit`,
/// `stop_repeating` or `abort_captures`.
pub trait CaptureCallbacks: Send + Sync {
    /// The platform accepted the request and started exposing.
    fn on_capture_started(&self, request: RequestId, timestamp_ns: u64);

    /// A frame was produced for `request`.
    fn on_frame_available(&self, request: RequestId, frame: Frame);

    /// The platform failed to produce one frame.
    fn on_capture_failed(&self, request: RequestId, failure: CaptureFailure);

    /// A frame could not be filled because no buffer slot was free.
    fn on_buffer_lost(&self, request: RequestId, frame_number: u64);

    /// The sequence for `request` ended normally.
    fn on_sequence_completed(&self, request: RequestId, last_frame_number: Option<u64>);

    /// The sequence for `request` was aborted before completing.
    fn on_sequence_aborted(&self, request: RequestId);
}

/// Device-level notifications, registered when the device is opened.
pub trait DeviceCallbacks: Send + Sync {
    /// The device is no longer usable, e.g. unplugged or taken over.
    fn on_disconnected(&self, device: DeviceId);

    /// The device hit a fatal error.
    fn on_error(&self, device: DeviceId, status: PlatformStatus);
}
