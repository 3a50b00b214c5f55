use std::collections::HashSet;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use crate::models::config::CameraConfiguration;
use crate::models::device::{Device, DeviceId, Facing};
use crate::models::diagnostics::SessionDiagnostics;
use crate::models::error::CameraError;
use crate::models::request::RequestId;
use crate::models::state::{HandleState, SessionState};
use crate::models::status::PlatformStatus;
use crate::traits::camera_platform::PlatformDevice;
use crate::traits::capture_callbacks::DeviceCallbacks;
use crate::traits::frame_sink::FrameSink;
use crate::traits::session_delegate::SessionDelegate;

use super::capture_session::{CaptureSession, SharedConnection, SharedDelegate};

/// Receives connection-level events for one open device and forwards them to
/// its session.
pub(crate) struct DeviceLink {
    device: DeviceId,
    lost: Mutex<Option<PlatformStatus>>,
    session: Mutex<Weak<CaptureSession>>,
    delegate: SharedDelegate,
}

impl DeviceLink {
    pub(crate) fn new(device: DeviceId) -> Self {
        Self {
            device,
            lost: Mutex::new(None),
            session: Mutex::new(Weak::new()),
            delegate: Arc::new(Mutex::new(None)),
        }
    }

    fn lost(&self) -> Option<PlatformStatus> {
        *self.lost.lock()
    }

    fn mark_lost(&self, status: PlatformStatus) {
        {
            let mut lost = self.lost.lock();
            if lost.is_some() {
                return;
            }
            *lost = Some(status);
        }
        log::error!("device {}: connection lost ({})", self.device, status);

        let session = self.session.lock().upgrade();
        match session {
            Some(session) => session.device_lost(status),
            None => {
                let delegate = self.delegate.lock().clone();
                if let Some(delegate) = delegate {
                    delegate.on_error(
                        self.device,
                        &CameraError::DeviceUnavailable {
                            id: self.device,
                            status,
                        },
                    );
                }
            }
        }
    }
}

impl DeviceCallbacks for DeviceLink {
    fn on_disconnected(&self, device: DeviceId) {
        debug_assert_eq!(device, self.device);
        self.mark_lost(PlatformStatus::CameraDisconnected);
    }

    fn on_error(&self, device: DeviceId, status: PlatformStatus) {
        debug_assert_eq!(device, self.device);
        self.mark_lost(status);
    }
}

/// An open camera device.
///
/// Owns the platform connection and, once the first request is made, the
/// device's [`CaptureSession`]. Closing the handle (explicitly or on drop)
/// stops any active capture, waits a bounded time for the platform to wind
/// down, releases the connection and frees the device for another `open`.
pub struct DeviceHandle {
    device: Device,
    state: HandleState,
    config: CameraConfiguration,
    connection: SharedConnection,
    link: Arc<DeviceLink>,
    session: OnceLock<Arc<CaptureSession>>,
    open_devices: Arc<Mutex<HashSet<DeviceId>>>,
}

impl DeviceHandle {
    pub(crate) fn new(
        device: Device,
        config: CameraConfiguration,
        connection: Box<dyn PlatformDevice>,
        link: Arc<DeviceLink>,
        open_devices: Arc<Mutex<HashSet<DeviceId>>>,
    ) -> Self {
        Self {
            device,
            state: HandleState::Open,
            config,
            connection: Arc::new(Mutex::new(connection)),
            link,
            session: OnceLock::new(),
            open_devices,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.device.id()
    }

    pub fn facing(&self) -> Facing {
        self.device.facing()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == HandleState::Open
    }

    /// Whether the platform reported the device as gone.
    pub fn is_lost(&self) -> bool {
        self.link.lost().is_some()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.get().map_or(SessionState::Idle, |session| session.state())
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.session.get().map(|session| session.diagnostics()).unwrap_or_default()
    }

    /// Receive session state changes and asynchronous errors.
    pub fn set_delegate(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.link.delegate.lock() = Some(delegate);
    }

    /// Capture one frame into `sink`.
    pub fn capture(&self, sink: Arc<dyn FrameSink>) -> Result<RequestId, CameraError> {
        self.session()?.capture(sink)
    }

    /// Stream frames into `sink` until [`stop_repeat`](Self::stop_repeat).
    pub fn repeat(&self, sink: Arc<dyn FrameSink>) -> Result<RequestId, CameraError> {
        self.session()?.repeat(sink)
    }

    pub fn stop_repeat(&self) -> Result<(), CameraError> {
        match self.existing_session()? {
            Some(session) => session.stop_repeat(),
            None => Ok(()),
        }
    }

    pub fn stop_capture(&self) -> Result<(), CameraError> {
        match self.existing_session()? {
            Some(session) => session.stop_capture(),
            None => Ok(()),
        }
    }

    /// Close the device. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == HandleState::Closed {
            return;
        }
        let id = self.device.id();
        log::info!("closing device {}", id);

        if let Some(session) = self.session.get() {
            session.close();
            let diagnostics = session.diagnostics();
            log::debug!(
                "device {}: {} delivered, {} dropped over {} requests",
                id,
                diagnostics.frames_delivered,
                diagnostics.dropped(),
                diagnostics.requests_submitted
            );
        }
        self.connection.lock().close();
        *self.link.session.lock() = Weak::new();

        self.open_devices.lock().remove(&id);
        self.state = HandleState::Closed;
        log::info!("device {} closed", id);
    }

    fn check_usable(&self) -> Result<(), CameraError> {
        let id = self.device.id();
        if self.state == HandleState::Closed {
            return Err(CameraError::DeviceClosed(id));
        }
        if let Some(status) = self.link.lost() {
            return Err(CameraError::DeviceUnavailable { id, status });
        }
        Ok(())
    }

    /// Session for a stop request. Nothing to stop before the first request.
    fn existing_session(&self) -> Result<Option<&Arc<CaptureSession>>, CameraError> {
        self.check_usable()?;
        Ok(self.session.get())
    }

    fn session(&self) -> Result<&Arc<CaptureSession>, CameraError> {
        self.check_usable()?;
        Ok(self.session.get_or_init(|| {
            let id = self.device.id();
            log::debug!("device {}: creating capture session", id);
            let session = CaptureSession::new(
                self.device.clone(),
                self.config.clone(),
                Arc::clone(&self.connection),
                Arc::clone(&self.link.delegate),
            );
            *self.link.session.lock() = Arc::downgrade(&session);
            session
        }))
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("device", &self.device)
            .field("state", &self.state)
            .field("session", &self.session_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::{PixelFormat, StreamTarget};
    use crate::processing::frame_queue::FrameQueue;
    use crate::testing::{back_camera, RecordingDelegate, ScriptedPlatform};
    use crate::traits::camera_platform::CameraPlatform;

    fn open(platform: &ScriptedPlatform) -> (DeviceHandle, Arc<Mutex<HashSet<DeviceId>>>) {
        let link = Arc::new(DeviceLink::new(DeviceId(0)));
        let connection = platform
            .open_device(DeviceId(0), Arc::clone(&link) as Arc<dyn DeviceCallbacks>)
            .unwrap();
        let open_devices = Arc::new(Mutex::new(HashSet::from([DeviceId(0)])));
        let handle = DeviceHandle::new(
            back_camera(),
            CameraConfiguration::default(),
            connection,
            link,
            Arc::clone(&open_devices),
        );
        (handle, open_devices)
    }

    fn queue() -> Arc<FrameQueue> {
        Arc::new(FrameQueue::new(StreamTarget::new(PixelFormat::Yuv420_888, 1920, 1080), 4))
    }

    #[test]
    fn close_releases_connection_and_reservation() {
        let platform = ScriptedPlatform::new();
        let (mut handle, open_devices) = open(&platform);

        handle.close();
        assert!(!handle.is_open());
        assert_eq!(platform.close_calls(), 1);
        assert!(open_devices.lock().is_empty());

        handle.close();
        assert_eq!(platform.close_calls(), 1);
    }

    #[test]
    fn drop_closes() {
        let platform = ScriptedPlatform::new();
        let (handle, open_devices) = open(&platform);
        drop(handle);

        assert_eq!(platform.close_calls(), 1);
        assert!(open_devices.lock().is_empty());
    }

    #[test]
    fn requests_on_closed_handle_fail() {
        let platform = ScriptedPlatform::new();
        let (mut handle, _) = open(&platform);
        handle.close();

        assert_eq!(handle.capture(queue()).unwrap_err(), CameraError::DeviceClosed(DeviceId(0)));
        assert_eq!(handle.repeat(queue()).unwrap_err(), CameraError::DeviceClosed(DeviceId(0)));
        assert_eq!(handle.stop_repeat().unwrap_err(), CameraError::DeviceClosed(DeviceId(0)));
        assert_eq!(handle.stop_capture().unwrap_err(), CameraError::DeviceClosed(DeviceId(0)));
    }

    #[test]
    fn stops_before_any_request_are_noops() {
        let platform = ScriptedPlatform::new();
        let (handle, _) = open(&platform);

        handle.stop_repeat().unwrap();
        handle.stop_capture().unwrap();
        assert_eq!(handle.session_state(), SessionState::Idle);
        assert_eq!(platform.stop_calls() + platform.abort_calls(), 0);
    }

    #[test]
    fn close_while_repeating_forces_idle() {
        let platform = ScriptedPlatform::new().with_auto_end(true);
        let (mut handle, _) = open(&platform);
        let sink = queue();

        let request = handle.repeat(sink.clone()).unwrap();
        let callbacks = platform.callbacks_for(request);
        callbacks.on_frame_available(request, platform.frame(1, 0));

        handle.close();
        assert_eq!(handle.session_state(), SessionState::Idle);

        callbacks.on_frame_available(request, platform.frame(2, 1));
        assert_eq!(sink.len(), 1);
        assert_eq!(handle.diagnostics().frames_delivered, 1);
    }

    #[test]
    fn disconnect_before_session_is_reported() {
        let platform = ScriptedPlatform::new();
        let (handle, _) = open(&platform);
        let recorder = RecordingDelegate::new();
        handle.set_delegate(recorder.clone());

        platform.device_callbacks(DeviceId(0)).on_disconnected(DeviceId(0));

        assert!(handle.is_lost());
        assert!(handle.is_open());
        let expected = CameraError::DeviceUnavailable {
            id: DeviceId(0),
            status: PlatformStatus::CameraDisconnected,
        };
        assert_eq!(recorder.errors(), vec![expected.clone()]);
        assert_eq!(handle.capture(queue()).unwrap_err(), expected);
    }

    #[test]
    fn disconnect_while_repeating_forces_idle() {
        let platform = ScriptedPlatform::new();
        let (handle, _) = open(&platform);
        let sink = queue();

        let request = handle.repeat(sink.clone()).unwrap();
        let callbacks = platform.callbacks_for(request);
        callbacks.on_capture_started(request, 0);

        platform
            .device_callbacks(DeviceId(0))
            .on_error(DeviceId(0), PlatformStatus::CameraDevice);
        assert_eq!(handle.session_state(), SessionState::Idle);

        callbacks.on_frame_available(request, platform.frame(1, 0));
        assert!(sink.is_empty());
    }

    #[test]
    fn device_error_reports_its_status() {
        let platform = ScriptedPlatform::new();
        let (handle, _) = open(&platform);
        let recorder = RecordingDelegate::new();
        handle.set_delegate(recorder.clone());
        handle.capture(queue()).unwrap();

        let link = platform.device_callbacks(DeviceId(0));
        link.on_error(DeviceId(0), PlatformStatus::CameraService);
        link.on_disconnected(DeviceId(0));

        let expected = CameraError::DeviceUnavailable {
            id: DeviceId(0),
            status: PlatformStatus::CameraService,
        };
        assert_eq!(recorder.errors(), vec![expected.clone()]);
        assert_eq!(handle.stop_repeat().unwrap_err(), expected);
    }
}
