//! Scripted platform for unit tests. Nothing here runs on its own: tests
//! fire the stored callbacks by hand.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::device::{Device, DeviceId, Facing, PixelFormat, StreamConfiguration, StreamTarget};
use crate::models::error::CameraError;
use crate::models::frame::Frame;
use crate::models::request::{CaptureRequest, RequestId};
use crate::models::state::{CaptureMode, SessionState};
use crate::models::status::PlatformStatus;
use crate::processing::buffer_pool::BufferPool;
use crate::traits::camera_platform::{CameraPlatform, PlatformDevice};
use crate::traits::capture_callbacks::{CaptureCallbacks, DeviceCallbacks};
use crate::traits::session_delegate::SessionDelegate;

struct Submission {
    request: CaptureRequest,
    callbacks: Arc<dyn CaptureCallbacks>,
    ended: bool,
}

struct Script {
    permission: bool,
    initialize_status: Option<PlatformStatus>,
    devices: Vec<Device>,
    enumerations: usize,
    open_status: Option<PlatformStatus>,
    submit_status: Option<PlatformStatus>,
    auto_end: bool,
    submissions: Vec<Submission>,
    device_callbacks: HashMap<DeviceId, Arc<dyn DeviceCallbacks>>,
    stop_calls: usize,
    abort_calls: usize,
    close_calls: usize,
    shutdowns: usize,
}

#[derive(Clone)]
pub(crate) struct ScriptedPlatform {
    script: Arc<Mutex<Script>>,
    pool: BufferPool,
}

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn back_camera() -> Device {
    Device::new(DeviceId(0), Facing::Back)
        .with_stream_configurations(vec![StreamConfiguration::output(PixelFormat::Yuv420_888, 1920, 1080)])
}

pub(crate) fn front_camera() -> Device {
    Device::new(DeviceId(1), Facing::Front)
        .with_stream_configurations(vec![StreamConfiguration::output(PixelFormat::Yuv420_888, 1920, 1080)])
}

impl ScriptedPlatform {
    pub(crate) fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                permission: true,
                initialize_status: None,
                devices: vec![back_camera(), front_camera()],
                enumerations: 0,
                open_status: None,
                submit_status: None,
                auto_end: false,
                submissions: Vec::new(),
                device_callbacks: HashMap::new(),
                stop_calls: 0,
                abort_calls: 0,
                close_calls: 0,
                shutdowns: 0,
            })),
            pool: BufferPool::new(8),
        }
    }

    /// End sequences from a helper thread when asked to stop or abort.
    pub(crate) fn with_auto_end(self, auto_end: bool) -> Self {
        self.script.lock().auto_end = auto_end;
        self
    }

    pub(crate) fn set_permission(&self, granted: bool) {
        self.script.lock().permission = granted;
    }

    pub(crate) fn set_initialize_status(&self, status: Option<PlatformStatus>) {
        self.script.lock().initialize_status = status;
    }

    pub(crate) fn set_devices(&self, devices: Vec<Device>) {
        self.script.lock().devices = devices;
    }

    pub(crate) fn fail_open(&self, status: Option<PlatformStatus>) {
        self.script.lock().open_status = status;
    }

    pub(crate) fn fail_submit(&self, status: Option<PlatformStatus>) {
        self.script.lock().submit_status = status;
    }

    pub(crate) fn connection(&self, _id: DeviceId) -> Box<dyn PlatformDevice> {
        Box::new(ScriptedConnection {
            script: Arc::clone(&self.script),
        })
    }

    pub(crate) fn callbacks_for(&self, request: RequestId) -> Arc<dyn CaptureCallbacks> {
        let script = self.script.lock();
        let submission = script
            .submissions
            .iter()
            .find(|s| s.request.id == request)
            .expect("request was never submitted");
        Arc::clone(&submission.callbacks)
    }

    pub(crate) fn device_callbacks(&self, id: DeviceId) -> Arc<dyn DeviceCallbacks> {
        let script = self.script.lock();
        Arc::clone(script.device_callbacks.get(&id).expect("device was never opened"))
    }

    pub(crate) fn frame(&self, timestamp_ns: u64, frame_number: u64) -> Frame {
        Frame::new(
            StreamTarget::new(PixelFormat::Yuv420_888, 1920, 1080),
            timestamp_ns,
            frame_number,
            self.pool.try_acquire(),
        )
    }

    pub(crate) fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub(crate) fn submissions(&self) -> usize {
        self.script.lock().submissions.len()
    }

    pub(crate) fn stop_calls(&self) -> usize {
        self.script.lock().stop_calls
    }

    pub(crate) fn abort_calls(&self) -> usize {
        self.script.lock().abort_calls
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.script.lock().close_calls
    }

    pub(crate) fn enumerations(&self) -> usize {
        self.script.lock().enumerations
    }

    pub(crate) fn shutdowns(&self) -> usize {
        self.script.lock().shutdowns
    }
}

impl CameraPlatform for ScriptedPlatform {
    fn has_permission(&self) -> bool {
        self.script.lock().permission
    }

    fn initialize(&self) -> Result<(), PlatformStatus> {
        match self.script.lock().initialize_status {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformStatus> {
        let mut script = self.script.lock();
        script.enumerations += 1;
        Ok(script.devices.clone())
    }

    fn open_device(
        &self,
        id: DeviceId,
        callbacks: Arc<dyn DeviceCallbacks>,
    ) -> Result<Box<dyn PlatformDevice>, PlatformStatus> {
        let mut script = self.script.lock();
        if let Some(status) = script.open_status {
            return Err(status);
        }
        script.device_callbacks.insert(id, callbacks);
        drop(script);
        Ok(self.connection(id))
    }

    fn shutdown(&self) {
        self.script.lock().shutdowns += 1;
    }
}

struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnection {
    /// Mark matching sequences ended; when auto-ending, report them from a
    /// helper thread as the platform would.
    fn end_sequences(&self, repeating_only: bool, aborted: bool) {
        let mut script = self.script.lock();
        let auto_end = script.auto_end;
        let ended: Vec<(RequestId, Arc<dyn CaptureCallbacks>)> = script
            .submissions
            .iter_mut()
            .filter(|s| !s.ended && (!repeating_only || s.request.mode == CaptureMode::Repeating))
            .map(|s| {
                s.ended = auto_end;
                (s.request.id, Arc::clone(&s.callbacks))
            })
            .collect();
        drop(script);

        if !auto_end || ended.is_empty() {
            return;
        }
        thread::spawn(move || {
            for (request, callbacks) in ended {
                if aborted {
                    callbacks.on_sequence_aborted(request);
                } else {
                    callbacks.on_sequence_completed(request, None);
                }
            }
        });
    }
}

impl PlatformDevice for ScriptedConnection {
    fn submit(&mut self, request: &CaptureRequest, callbacks: Arc<dyn CaptureCallbacks>) -> Result<(), PlatformStatus> {
        let mut script = self.script.lock();
        if let Some(status) = script.submit_status {
            return Err(status);
        }
        script.submissions.push(Submission {
            request: *request,
            callbacks,
            ended: false,
        });
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), PlatformStatus> {
        self.script.lock().stop_calls += 1;
        self.end_sequences(true, false);
        Ok(())
    }

    fn abort_captures(&mut self) -> Result<(), PlatformStatus> {
        self.script.lock().abort_calls += 1;
        self.end_sequences(false, true);
        Ok(())
    }

    fn close(&mut self) {
        self.script.lock().close_calls += 1;
    }
}

/// Delegate that records everything it is told.
#[derive(Default)]
pub(crate) struct RecordingDelegate {
    states: Mutex<Vec<SessionState>>,
    errors: Mutex<Vec<CameraError>>,
}

impl RecordingDelegate {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn states(&self) -> Vec<SessionState> {
        self.states.lock().clone()
    }

    pub(crate) fn errors(&self) -> Vec<CameraError> {
        self.errors.lock().clone()
    }
}

impl SessionDelegate for RecordingDelegate {
    fn on_state_changed(&self, _device: DeviceId, state: &SessionState) {
        self.states.lock().push(*state);
    }

    fn on_error(&self, _device: DeviceId, error: &CameraError) {
        self.errors.lock().push(error.clone());
    }
}
