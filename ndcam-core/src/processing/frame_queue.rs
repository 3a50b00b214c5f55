use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::models::device::StreamTarget;
use crate::models::frame::Frame;
use crate::traits::frame_sink::FrameSink;

/// Bounded FIFO frame sink, modelled on an image reader.
///
/// Share it as `Arc<FrameQueue>`: one clone goes to `capture`/`repeat`, the
/// consumer keeps another and drains it with [`acquire_next`] or
/// [`acquire_latest`].
///
/// Overflow behavior: new frames are refused while the queue is full and
/// handed back to the producer (unlike `RingBuffer`-style overwrite, the
/// queued frames are never evicted).
///
/// [`acquire_next`]: FrameQueue::acquire_next
/// [`acquire_latest`]: FrameQueue::acquire_latest
#[derive(Debug)]
pub struct FrameQueue {
    target: StreamTarget,
    capacity: usize,
    frames: Mutex<VecDeque<Frame>>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl FrameQueue {
    pub fn new(target: StreamTarget, capacity: usize) -> Self {
        Self {
            target,
            capacity,
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Take the oldest queued frame.
    pub fn acquire_next(&self) -> Option<Frame> {
        self.frames.lock().pop_front()
    }

    /// Take the newest queued frame, releasing every older one.
    pub fn acquire_latest(&self) -> Option<Frame> {
        let mut frames = self.frames.lock();
        let latest = frames.pop_back();
        frames.drain(..).for_each(Frame::release);
        latest
    }

    /// Release every queued frame.
    pub fn clear(&self) {
        self.frames.lock().drain(..).for_each(Frame::release);
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Total number of frames ever accepted.
    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Total number of frames refused because the queue was full.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl FrameSink for FrameQueue {
    fn target(&self) -> StreamTarget {
        self.target
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn accept(&self, frame: Frame) -> Result<(), Frame> {
        let mut frames = self.frames.lock();
        if frames.len() >= self.capacity {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(frame);
        }
        frames.push_back(frame);
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
