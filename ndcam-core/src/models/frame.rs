use std::fmt;

use crate::processing::buffer_pool::SlotLease;

use super::device::{PixelFormat, StreamTarget};

/// A frame produced by the platform and handed to a `FrameSink`.
///
/// The frame pins one hardware buffer slot until it is released, either
/// explicitly through [`Frame::release`] or implicitly when dropped. Holding on
/// to frames starves the producer, which then reports lost buffers.
pub struct Frame {
    format: PixelFormat,
    width: u32,
    height: u32,
    timestamp_ns: u64,
    frame_number: u64,
    slot: Option<SlotLease>,
}

impl Frame {
    pub fn new(target: StreamTarget, timestamp_ns: u64, frame_number: u64, slot: Option<SlotLease>) -> Self {
        Self {
            format: target.format,
            width: target.width,
            height: target.height,
            timestamp_ns,
            frame_number,
            slot,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sensor timestamp in nanoseconds. Monotonic within a repeating run.
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Index of the buffer slot backing this frame, if any.
    pub fn slot(&self) -> Option<usize> {
        self.slot.as_ref().map(SlotLease::index)
    }

    /// Return the buffer slot to the producer.
    pub fn release(mut self) {
        self.slot.take();
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timestamp_ns", &self.timestamp_ns)
            .field("frame_number", &self.frame_number)
            .field("slot", &self.slot())
            .finish()
    }
}
