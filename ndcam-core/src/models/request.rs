use std::fmt;

use super::device::StreamTarget;
use super::state::CaptureMode;

/// Session-unique identifier of a submitted capture request.
///
/// The platform echoes it in every callback so that notifications belonging to
/// a cancelled or superseded request can be recognized and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One submission to the platform device. Lives only for the `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub id: RequestId,
    pub mode: CaptureMode,
    pub target: StreamTarget,
}

/// Why the platform failed to produce a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The pipeline hit an error while producing the frame.
    Error,
    /// The request was flushed before the frame was produced.
    Flushed,
}

/// Asynchronous per-frame failure report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureFailure {
    pub frame_number: u64,
    pub reason: FailureReason,
    pub was_image_captured: bool,
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            FailureReason::Error => "error",
            FailureReason::Flushed => "flushed",
        };
        write!(
            f,
            "frame {} {} (image captured: {})",
            self.frame_number, reason, self.was_image_captured
        )
    }
}
