use crate::models::device::DeviceId;
use crate::models::error::CameraError;
use crate::models::state::SessionState;

/// Event delegate for capture session notifications.
///
/// Called from whichever thread caused the change: the caller's thread for
/// requested transitions, the platform's callback context for
/// acknowledgments, completions and asynchronous errors. Never called with
/// session locks held.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, device: DeviceId, state: &SessionState);

    /// Called for asynchronous errors and non-fatal inconsistencies.
    fn on_error(&self, device: DeviceId, error: &CameraError);
}
