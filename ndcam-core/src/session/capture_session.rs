use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::models::config::CameraConfiguration;
use crate::models::device::{Device, DeviceId};
use crate::models::diagnostics::SessionDiagnostics;
use crate::models::error::CameraError;
use crate::models::frame::Frame;
use crate::models::request::{CaptureFailure, CaptureRequest, FailureReason, RequestId};
use crate::models::state::{CaptureMode, SessionState};
use crate::models::status::PlatformStatus;
use crate::traits::camera_platform::PlatformDevice;
use crate::traits::capture_callbacks::CaptureCallbacks;
use crate::traits::frame_sink::FrameSink;
use crate::traits::session_delegate::SessionDelegate;

pub(crate) type SharedDelegate = Arc<Mutex<Option<Arc<dyn SessionDelegate>>>>;
pub(crate) type SharedConnection = Arc<Mutex<Box<dyn PlatformDevice>>>;

/// Notification collected under the core lock, dispatched after it is released.
enum Notice {
    State(SessionState),
    Error(CameraError),
}

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionCore {
    device: DeviceId,
    state: SessionState,
    sink: Option<Arc<dyn FrameSink>>,
    /// Request whose frames may still reach the sink.
    active: Option<RequestId>,
    /// Requests the platform has not reported as ended yet.
    outstanding: Vec<RequestId>,
    last_timestamp: Option<u64>,
    last_frame_number: Option<u64>,
    lost: Option<PlatformStatus>,
    closed: bool,
    diagnostics: SessionDiagnostics,
}

impl SessionCore {
    fn new(device: DeviceId) -> Self {
        Self {
            device,
            state: SessionState::Idle,
            sink: None,
            active: None,
            outstanding: Vec::new(),
            last_timestamp: None,
            last_frame_number: None,
            lost: None,
            closed: false,
            diagnostics: SessionDiagnostics::default(),
        }
    }

    fn set_state(&mut self, to: SessionState, notices: &mut Vec<Notice>) {
        if self.state == to {
            return;
        }
        log::debug!("device {}: session {} -> {}", self.device, self.state, to);
        self.state = to;
        notices.push(Notice::State(to));
    }

    /// Detach the active request and sink, then go idle. Frames that are
    /// still in flight for the detached request will be discarded.
    fn reset_to_idle(&mut self, notices: &mut Vec<Notice>) {
        self.active = None;
        self.sink = None;
        self.set_state(SessionState::Idle, notices);
    }

    fn is_active(&self, request: RequestId) -> bool {
        self.active == Some(request)
    }

    fn end_sequence(&mut self, request: RequestId) {
        self.outstanding.retain(|r| *r != request);
    }
}

/// Capture state machine for one opened device.
///
/// Caller-side operations are serialized by `transition`; platform callbacks
/// only take the short `core` lock. Frames are handed to the sink while
/// `core` is held, so once a forced transition to idle releases that lock no
/// further frame reaches any sink.
///
/// ```text
/// [caller] ─capture/repeat/stop─→ [transition] → [core] → [PlatformDevice]
///                                                   ↑
/// [platform context] ─ack/frame/end─────────────────┘ → [FrameSink]
/// ```
pub struct CaptureSession {
    device: Device,
    config: CameraConfiguration,
    connection: SharedConnection,
    delegate: SharedDelegate,
    transition: Mutex<()>,
    core: Mutex<SessionCore>,
    sequence_ended: Condvar,
    next_request: AtomicU64,
    this: Weak<CaptureSession>,
}

impl CaptureSession {
    pub(crate) fn new(
        device: Device,
        config: CameraConfiguration,
        connection: SharedConnection,
        delegate: SharedDelegate,
    ) -> Arc<Self> {
        let id = device.id();
        Arc::new_cyclic(|this| Self {
            device,
            config,
            connection,
            delegate,
            transition: Mutex::new(()),
            core: Mutex::new(SessionCore::new(id)),
            sequence_ended: Condvar::new(),
            next_request: AtomicU64::new(1),
            this: this.clone(),
        })
    }

    pub fn device_id(&self) -> DeviceId {
        self.device.id()
    }

    pub fn state(&self) -> SessionState {
        self.core.lock().state
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.core.lock().diagnostics.clone()
    }

    /// Submit a single-shot request. Transitions: idle → requesting.
    ///
    /// Returns once the request is queued on the platform; the frame arrives
    /// at `sink` asynchronously and the session then returns to idle.
    pub fn capture(&self, sink: Arc<dyn FrameSink>) -> Result<RequestId, CameraError> {
        self.submit(sink, CaptureMode::SingleShot)
    }

    /// Submit a repeating request. Transitions: idle → requesting.
    pub fn repeat(&self, sink: Arc<dyn FrameSink>) -> Result<RequestId, CameraError> {
        self.submit(sink, CaptureMode::Repeating)
    }

    /// Stop a repeating stream. Transitions: repeating → stopping.
    ///
    /// No-op unless a repeating request is active. One more in-flight frame
    /// may still be delivered before the platform acknowledges the stop.
    pub fn stop_repeat(&self) -> Result<(), CameraError> {
        let _transition = self.transition.lock();

        let mut notices = Vec::new();
        let stopping = {
            let mut core = self.core.lock();
            if core.state.is_repeating() {
                core.set_state(SessionState::Stopping, &mut notices);
                true
            } else {
                log::debug!("device {}: stop_repeat ignored while {}", core.device, core.state);
                false
            }
        };
        self.notify(notices);

        if !stopping {
            return Ok(());
        }

        let result = self.connection.lock().stop_repeating();
        if let Err(status) = result {
            log::warn!("device {}: stop_repeating failed: {}", self.device.id(), status);
            let mut notices = Vec::new();
            self.core.lock().reset_to_idle(&mut notices);
            self.notify(notices);
            return Err(CameraError::from_device_status(self.device.id(), status));
        }
        Ok(())
    }

    /// Cancel a single-shot request that has not produced its frame yet.
    ///
    /// No-op when idle or while a repeating stream is active.
    pub fn stop_capture(&self) -> Result<(), CameraError> {
        let _transition = self.transition.lock();

        let mut notices = Vec::new();
        let cancelled = {
            let mut core = self.core.lock();
            if core.state.is_single_shot() {
                log::debug!("device {}: cancelling single-shot {:?}", core.device, core.active);
                core.reset_to_idle(&mut notices);
                true
            } else {
                false
            }
        };
        self.notify(notices);

        if cancelled {
            let result = self.connection.lock().abort_captures();
            if let Err(status) = result {
                log::warn!("device {}: abort_captures failed: {}", self.device.id(), status);
                return Err(CameraError::from_device_status(self.device.id(), status));
            }
        }
        Ok(())
    }

    /// Force the session idle and wait, bounded by the configured close
    /// timeout, for the platform to end every outstanding sequence.
    ///
    /// After this returns no frame is delivered to any sink.
    pub(crate) fn close(&self) {
        let _transition = self.transition.lock();

        let mut notices = Vec::new();
        let outstanding = {
            let mut core = self.core.lock();
            core.closed = true;
            core.reset_to_idle(&mut notices);
            !core.outstanding.is_empty()
        };
        self.notify(notices);

        if !outstanding {
            return;
        }

        let result = self.connection.lock().abort_captures();
        if let Err(status) = result {
            log::warn!("device {}: abort on close failed: {}", self.device.id(), status);
        }

        let timeout = self.config.close_timeout;
        let deadline = Instant::now() + timeout;
        let timed_out = {
            let mut core = self.core.lock();
            while !core.outstanding.is_empty() {
                if self.sequence_ended.wait_until(&mut core, deadline).timed_out() {
                    break;
                }
            }
            let timed_out = !core.outstanding.is_empty();
            if timed_out {
                core.diagnostics.close_timeouts += 1;
                core.outstanding.clear();
            }
            timed_out
        };

        if timed_out {
            log::warn!(
                "device {}: platform did not end in-flight sequences within {:?}, closing anyway",
                self.device.id(),
                timeout
            );
            self.notify(vec![Notice::Error(CameraError::CloseTimedOut(timeout))]);
        }
    }

    /// The device connection is gone: drop whatever is active and refuse
    /// further requests.
    pub(crate) fn device_lost(&self, status: PlatformStatus) {
        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            core.lost = Some(status);
            core.reset_to_idle(&mut notices);
            core.outstanding.clear();
        }
        self.sequence_ended.notify_all();
        notices.push(Notice::Error(CameraError::DeviceUnavailable {
            id: self.device.id(),
            status,
        }));
        self.notify(notices);
    }

    fn submit(&self, sink: Arc<dyn FrameSink>, mode: CaptureMode) -> Result<RequestId, CameraError> {
        let _transition = self.transition.lock();
        let id = self.device.id();

        let target = sink.target();
        let mut notices = Vec::new();
        let request = {
            let mut core = self.core.lock();
            if core.closed {
                return Err(CameraError::DeviceClosed(id));
            }
            if let Some(status) = core.lost {
                return Err(CameraError::DeviceUnavailable { id, status });
            }
            if !core.state.is_idle() {
                return Err(CameraError::SessionBusy(core.state));
            }
            if self.config.validate_stream_targets && !self.device.supports(&target) {
                return Err(CameraError::UnsupportedStream(target));
            }

            let request = CaptureRequest {
                id: RequestId(self.next_request.fetch_add(1, Ordering::SeqCst)),
                mode,
                target,
            };
            core.sink = Some(sink);
            core.active = Some(request.id);
            core.outstanding.push(request.id);
            core.last_timestamp = None;
            core.last_frame_number = None;
            core.diagnostics.requests_submitted += 1;
            core.set_state(SessionState::Requesting(mode), &mut notices);
            request
        };
        self.notify(notices);

        let callbacks: Arc<dyn CaptureCallbacks> = Arc::new(SessionCallbacks {
            session: self.this.clone(),
        });
        let result = self.connection.lock().submit(&request, callbacks);
        if let Err(status) = result {
            log::error!("device {}: submit {} failed: {}", id, request.id, status);
            let mut notices = Vec::new();
            {
                let mut core = self.core.lock();
                core.end_sequence(request.id);
                if core.is_active(request.id) {
                    core.reset_to_idle(&mut notices);
                }
            }
            self.notify(notices);
            return Err(CameraError::from_device_status(id, status));
        }

        log::debug!("device {}: submitted {} ({:?}, {})", id, request.id, mode, target);
        Ok(request.id)
    }

    fn notify(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let Some(delegate) = self.delegate.lock().clone() else {
            return;
        };
        let id = self.device.id();
        for notice in notices {
            match notice {
                Notice::State(state) => delegate.on_state_changed(id, &state),
                Notice::Error(error) => delegate.on_error(id, &error),
            }
        }
    }

    // --- Platform callbacks ---

    fn handle_started(&self, request: RequestId, timestamp_ns: u64) {
        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            if !core.is_active(request) {
                return;
            }
            if let SessionState::Requesting(mode) = core.state {
                log::debug!("device {}: {} acknowledged at {}", core.device, request, timestamp_ns);
                core.set_state(acknowledged(mode), &mut notices);
            }
        }
        self.notify(notices);
    }

    fn handle_frame(&self, request: RequestId, frame: Frame) {
        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            if !core.is_active(request) || !core.state.accepts_frames() {
                core.diagnostics.frames_discarded += 1;
                frame.release();
                return;
            }

            if let SessionState::Requesting(mode) = core.state {
                core.set_state(acknowledged(mode), &mut notices);
            }

            if core.last_timestamp.is_some_and(|last| frame.timestamp_ns() < last) {
                log::warn!(
                    "device {}: discarding out-of-order frame {} ({} < {:?})",
                    core.device,
                    frame.frame_number(),
                    frame.timestamp_ns(),
                    core.last_timestamp
                );
                core.diagnostics.frames_discarded += 1;
                frame.release();
                drop(core);
                self.notify(notices);
                return;
            }
            core.last_timestamp = Some(frame.timestamp_ns());
            core.last_frame_number = Some(frame.frame_number());

            match core.sink.clone() {
                Some(sink) => match sink.accept(frame) {
                    Ok(()) => core.diagnostics.frames_delivered += 1,
                    Err(frame) => {
                        core.diagnostics.frames_rejected += 1;
                        frame.release();
                    }
                },
                None => {
                    core.diagnostics.frames_discarded += 1;
                    frame.release();
                }
            }

            if core.state == SessionState::SingleShot {
                core.reset_to_idle(&mut notices);
            }
        }
        self.notify(notices);
    }

    fn handle_failed(&self, request: RequestId, failure: CaptureFailure) {
        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            if !core.is_active(request) {
                return;
            }
            log::error!("device {}: capture {} failed: {}", core.device, request, failure);
            core.diagnostics.capture_failures += 1;
            core.last_frame_number = Some(failure.frame_number);
            if core.state.is_single_shot() {
                core.reset_to_idle(&mut notices);
            }
            notices.push(Notice::Error(CameraError::CaptureFailed(failure)));
        }
        self.notify(notices);
    }

    fn handle_buffer_lost(&self, request: RequestId, frame_number: u64) {
        let mut core = self.core.lock();
        if core.is_active(request) {
            log::debug!("device {}: buffer lost for frame {}", core.device, frame_number);
            core.diagnostics.buffers_lost += 1;
            core.last_frame_number = Some(frame_number);
        }
    }

    fn handle_completed(&self, request: RequestId, last_frame_number: Option<u64>) {
        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            core.end_sequence(request);
            core.diagnostics.sequences_completed += 1;
            if core.is_active(request) {
                log::debug!(
                    "device {}: sequence {} completed (last frame {:?})",
                    core.device,
                    request,
                    last_frame_number
                );
                core.reset_to_idle(&mut notices);
            }
        }
        self.sequence_ended.notify_all();
        self.notify(notices);
    }

    fn handle_aborted(&self, request: RequestId) {
        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            core.end_sequence(request);
            core.diagnostics.sequences_aborted += 1;
            if core.is_active(request) {
                if core.state != SessionState::Stopping {
                    log::warn!("device {}: sequence {} aborted by platform", core.device, request);
                    let failure = CaptureFailure {
                        frame_number: core.last_frame_number.map_or(0, |n| n + 1),
                        reason: FailureReason::Flushed,
                        was_image_captured: false,
                    };
                    notices.push(Notice::Error(CameraError::CaptureFailed(failure)));
                }
                core.reset_to_idle(&mut notices);
            }
        }
        self.sequence_ended.notify_all();
        self.notify(notices);
    }
}

fn acknowledged(mode: CaptureMode) -> SessionState {
    match mode {
        CaptureMode::SingleShot => SessionState::SingleShot,
        CaptureMode::Repeating => SessionState::Repeating,
    }
}

/// Callback target handed to the platform for each request.
///
/// Holds the session weakly so a platform that keeps callbacks around cannot
/// keep a closed session alive.
struct SessionCallbacks {
    session: Weak<CaptureSession>,
}

impl CaptureCallbacks for SessionCallbacks {
    fn on_capture_started(&self, request: RequestId, timestamp_ns: u64) {
        if let Some(session) = self.session.upgrade() {
            session.handle_started(request, timestamp_ns);
        }
    }

    fn on_frame_available(&self, request: RequestId, frame: Frame) {
        match self.session.upgrade() {
            Some(session) => session.handle_frame(request, frame),
            None => frame.release(),
        }
    }

    fn on_capture_failed(&self, request: RequestId, failure: CaptureFailure) {
        if let Some(session) = self.session.upgrade() {
            session.handle_failed(request, failure);
        }
    }

    fn on_buffer_lost(&self, request: RequestId, frame_number: u64) {
        if let Some(session) = self.session.upgrade() {
            session.handle_buffer_lost(request, frame_number);
        }
    }

    fn on_sequence_completed(&self, request: RequestId, last_frame_number: Option<u64>) {
        if let Some(session) = self.session.upgrade() {
            session.handle_completed(request, last_frame_number);
        }
    }

    fn on_sequence_aborted(&self, request: RequestId) {
        if let Some(session) = self.session.upgrade() {
            session.handle_aborted(request);
        }
    }
}
