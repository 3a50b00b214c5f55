use crate::models::device::StreamTarget;
use crate::models::frame::Frame;

/// Bounded consumer of produced frames, created externally with a fixed
/// format, resolution and capacity.
///
/// The session only targets a sink; it never owns one.
pub trait FrameSink: Send + Sync {
    /// Format and resolution the sink expects.
    fn target(&self) -> StreamTarget;

    /// Maximum number of frames the sink holds at once.
    fn capacity(&self) -> usize;

    /// Offer a frame to the sink.
    ///
    /// `Ok(())` moves ownership into the sink, which must eventually release
    /// the frame. `Err(frame)` means the sink is full or refused it; ownership
    /// goes back to the caller, which must release it.
    ///
    /// Called while the session's lock is held. Must not call back into the
    /// session.
    fn accept(&self, frame: Frame) -> Result<(), Frame>;
}
