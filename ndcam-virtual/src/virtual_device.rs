//! Virtual camera connection.
//!
//! Every submitted request runs on its own named sensor thread which emits
//! the start acknowledgment, frames and the sequence end through the
//! request's `CaptureCallbacks`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use ndcam_core::models::device::DeviceId;
use ndcam_core::models::frame::Frame;
use ndcam_core::models::request::{CaptureFailure, CaptureRequest, FailureReason, RequestId};
use ndcam_core::models::state::CaptureMode;
use ndcam_core::models::status::PlatformStatus;
use ndcam_core::processing::buffer_pool::BufferPool;
use ndcam_core::traits::camera_platform::PlatformDevice;
use ndcam_core::traits::capture_callbacks::CaptureCallbacks;

/// Monotonic sensor clock shared by every device of one platform.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SensorClock {
    epoch: Instant,
}

impl SensorClock {
    pub(crate) fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    pub(crate) fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    /// Finish the current frame, then report completion.
    Stop,
    /// Drop everything and report the abort.
    Abort,
    /// Connection gone: exit without reporting anything.
    Disconnect,
}

/// Stop/abort signal for one running sequence.
struct SequenceControl {
    state: Mutex<Control>,
    wake: Condvar,
}

impl SequenceControl {
    fn new() -> Self {
        Self {
            state: Mutex::new(Control::Run),
            wake: Condvar::new(),
        }
    }

    fn signal(&self, control: Control) {
        let mut state = self.state.lock();
        // Abort and disconnect override a pending stop; nothing overrides them.
        let replace = match *state {
            Control::Run => true,
            Control::Stop => control != Control::Run,
            Control::Abort => control == Control::Disconnect,
            Control::Disconnect => false,
        };
        if replace {
            *state = control;
            self.wake.notify_all();
        }
    }

    /// Sleep for `duration` unless signalled first.
    fn sleep(&self, duration: Duration) -> Control {
        let deadline = Instant::now() + duration;
        let mut state = self.state.lock();
        while *state == Control::Run {
            if self.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state
    }
}

/// State of an open device that the platform's fault injection reaches into.
pub(crate) struct DeviceShared {
    id: DeviceId,
    disconnected: AtomicBool,
    fail_next_capture: AtomicBool,
    sequences: Mutex<HashMap<RequestId, Arc<SequenceControl>>>,
}

impl DeviceShared {
    pub(crate) fn new(id: DeviceId) -> Self {
        Self {
            id,
            disconnected: AtomicBool::new(false),
            fail_next_capture: AtomicBool::new(false),
            sequences: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn fail_next_capture(&self) {
        self.fail_next_capture.store(true, Ordering::SeqCst);
    }

    /// Kill every running sequence without reporting its end.
    pub(crate) fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        for control in self.sequences.lock().values() {
            control.signal(Control::Disconnect);
        }
    }

    fn signal_all(&self, control: Control, filter: impl Fn(&RequestId) -> bool) -> usize {
        let sequences = self.sequences.lock();
        let mut signalled = 0;
        for (request, sequence) in sequences.iter().filter(|(request, _)| filter(request)) {
            log::trace!("device {}: signalling {} with {:?}", self.id, request, control);
            sequence.signal(control);
            signalled += 1;
        }
        signalled
    }
}

/// Timing shared by the sensor threads of one device.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SensorTiming {
    pub(crate) frame_interval: Duration,
    pub(crate) start_latency: Duration,
}

/// Connection to one virtual camera.
pub struct VirtualDevice {
    shared: Arc<DeviceShared>,
    timing: SensorTiming,
    clock: SensorClock,
    pool: BufferPool,
    frame_counter: Arc<AtomicU64>,
    stall_sequence_end: Arc<AtomicBool>,
    repeating: Vec<RequestId>,
    workers: Vec<thread::JoinHandle<()>>,
    on_close: Option<Box<dyn FnOnce(DeviceId) + Send>>,
    closed: bool,
}

impl VirtualDevice {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        timing: SensorTiming,
        clock: SensorClock,
        buffer_slots: usize,
        stall_sequence_end: Arc<AtomicBool>,
        on_close: Box<dyn FnOnce(DeviceId) + Send>,
    ) -> Self {
        Self {
            shared,
            timing,
            clock,
            pool: BufferPool::new(buffer_slots),
            frame_counter: Arc::new(AtomicU64::new(0)),
            stall_sequence_end,
            repeating: Vec::new(),
            workers: Vec::new(),
            on_close: Some(on_close),
            closed: false,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.shared.id
    }

    /// Buffer slots of this device; frames held by consumers keep slots leased.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    fn reap_finished(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = self.workers.drain(..).partition(|w| w.is_finished());
        self.workers = running;
        for worker in finished {
            if worker.join().is_err() {
                log::error!("device {}: sensor thread panicked", self.shared.id);
            }
        }
    }
}

impl PlatformDevice for VirtualDevice {
    fn submit(&mut self, request: &CaptureRequest, callbacks: Arc<dyn CaptureCallbacks>) -> Result<(), PlatformStatus> {
        if self.closed {
            return Err(PlatformStatus::SessionClosed);
        }
        if self.shared.disconnected.load(Ordering::SeqCst) {
            return Err(PlatformStatus::CameraDisconnected);
        }
        self.reap_finished();

        let control = Arc::new(SequenceControl::new());
        self.shared.sequences.lock().insert(request.id, Arc::clone(&control));

        let sensor = Sensor {
            request: *request,
            callbacks,
            control,
            shared: Arc::clone(&self.shared),
            timing: self.timing,
            clock: self.clock,
            pool: self.pool.clone(),
            frame_counter: Arc::clone(&self.frame_counter),
            stall_sequence_end: Arc::clone(&self.stall_sequence_end),
        };

        let worker = thread::Builder::new()
            .name(format!("ndcam-sensor-{}-{}", self.shared.id, request.id.0))
            .spawn(move || sensor.run())
            .map_err(|e| {
                log::error!("device {}: failed to spawn sensor thread: {}", self.shared.id, e);
                self.shared.sequences.lock().remove(&request.id);
                PlatformStatus::NotEnoughMemory
            })?;

        self.workers.push(worker);
        if request.mode == CaptureMode::Repeating {
            self.repeating.push(request.id);
        }
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), PlatformStatus> {
        if self.closed {
            return Err(PlatformStatus::SessionClosed);
        }
        let repeating = std::mem::take(&mut self.repeating);
        let signalled = self.shared.signal_all(Control::Stop, |r| repeating.contains(r));
        log::debug!("device {}: stopping {} repeating sequence(s)", self.shared.id, signalled);
        Ok(())
    }

    fn abort_captures(&mut self) -> Result<(), PlatformStatus> {
        if self.closed {
            return Err(PlatformStatus::SessionClosed);
        }
        self.repeating.clear();
        let signalled = self.shared.signal_all(Control::Abort, |_| true);
        log::debug!("device {}: aborting {} sequence(s)", self.shared.id, signalled);
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shared.signal_all(Control::Abort, |_| true);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("device {}: sensor thread panicked", self.shared.id);
            }
        }
        if let Some(on_close) = self.on_close.take() {
            on_close(self.shared.id);
        }
        log::debug!("device {}: virtual connection closed", self.shared.id);
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// Everything one sensor thread needs.
struct Sensor {
    request: CaptureRequest,
    callbacks: Arc<dyn CaptureCallbacks>,
    control: Arc<SequenceControl>,
    shared: Arc<DeviceShared>,
    timing: SensorTiming,
    clock: SensorClock,
    pool: BufferPool,
    frame_counter: Arc<AtomicU64>,
    stall_sequence_end: Arc<AtomicBool>,
}

impl Sensor {
    fn run(self) {
        let id = self.request.id;
        let (end, last_frame) = self.expose();
        self.shared.sequences.lock().remove(&id);

        if end == Control::Disconnect {
            log::debug!("device {}: sequence {} dropped by disconnect", self.shared.id, id);
            return;
        }
        if self.stall_sequence_end.load(Ordering::SeqCst) {
            log::debug!("device {}: withholding end of sequence {}", self.shared.id, id);
            return;
        }
        match end {
            Control::Abort => self.callbacks.on_sequence_aborted(id),
            _ => self.callbacks.on_sequence_completed(id, last_frame),
        }
    }

    /// Produce frames until the sequence ends. Returns how it ended and the
    /// last frame number attempted.
    fn expose(&self) -> (Control, Option<u64>) {
        let id = self.request.id;
        match self.control.sleep(self.timing.start_latency) {
            Control::Run => {}
            other => return (other, None),
        }
        self.callbacks.on_capture_started(id, self.clock.now_ns());

        loop {
            let frame_number = self.frame_counter.fetch_add(1, Ordering::SeqCst);
            self.produce(frame_number);

            if self.request.mode == CaptureMode::SingleShot {
                return (Control::Stop, Some(frame_number));
            }
            match self.control.sleep(self.timing.frame_interval) {
                Control::Run => {}
                other => return (other, Some(frame_number)),
            }
        }
    }

    fn produce(&self, frame_number: u64) {
        let id = self.request.id;
        if self.shared.fail_next_capture.swap(false, Ordering::SeqCst) {
            log::debug!("device {}: injected failure for frame {}", self.shared.id, frame_number);
            self.callbacks.on_capture_failed(
                id,
                CaptureFailure {
                    frame_number,
                    reason: FailureReason::Error,
                    was_image_captured: false,
                },
            );
            return;
        }
        match self.pool.try_acquire() {
            Some(slot) => {
                let frame = Frame::new(self.request.target, self.clock.now_ns(), frame_number, Some(slot));
                self.callbacks.on_frame_available(id, frame);
            }
            None => self.callbacks.on_buffer_lost(id, frame_number),
        }
    }
}
