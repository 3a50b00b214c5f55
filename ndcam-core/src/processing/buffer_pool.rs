use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Fixed set of hardware buffer slots shared between a producer and the
/// frames it hands out.
///
/// Cloning the pool yields another handle to the same slots. Each produced
/// frame holds a [`SlotLease`]; when every slot is leased the producer cannot
/// fill a new frame and has to report it as lost.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Mutex<PoolInner>>,
}

struct PoolInner {
    free: Vec<usize>,
    capacity: usize,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        // Reversed so slots are handed out in ascending order.
        let free = (0..capacity).rev().collect();
        Self {
            inner: Arc::new(Mutex::new(PoolInner { free, capacity })),
        }
    }

    /// Lease a free slot, or `None` if the pool is exhausted.
    pub fn try_acquire(&self) -> Option<SlotLease> {
        let index = self.inner.lock().free.pop()?;
        Some(SlotLease {
            pool: Arc::clone(&self.inner),
            index,
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    pub fn available(&self) -> usize {
        self.inner.lock().free.len()
    }

    pub fn in_use(&self) -> usize {
        let inner = self.inner.lock();
        inner.capacity - inner.free.len()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BufferPool")
            .field("capacity", &inner.capacity)
            .field("available", &inner.free.len())
            .finish()
    }
}

/// Exclusive claim on one buffer slot. The slot is returned on drop.
pub struct SlotLease {
    pool: Arc<Mutex<PoolInner>>,
    index: usize,
}

impl SlotLease {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.pool.lock().free.push(self.index);
    }
}
