use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use ndcam_core::models::device::{Device, DeviceId};
use ndcam_core::models::error::CameraError;
use ndcam_core::models::status::PlatformStatus;
use ndcam_core::traits::camera_platform::{CameraPlatform, PlatformDevice};
use ndcam_core::traits::capture_callbacks::DeviceCallbacks;

use crate::config::VirtualCameraConfig;
use crate::permissions::PermissionGate;
use crate::virtual_device::{DeviceShared, SensorClock, SensorTiming, VirtualDevice};

struct OpenDevice {
    shared: Arc<DeviceShared>,
    callbacks: Arc<dyn DeviceCallbacks>,
}

struct PlatformInner {
    config: VirtualCameraConfig,
    devices: Mutex<Vec<Device>>,
    permissions: PermissionGate,
    initialized: AtomicBool,
    initialize_status: Mutex<Option<PlatformStatus>>,
    open_rejections: Mutex<HashMap<DeviceId, PlatformStatus>>,
    open: Arc<Mutex<HashMap<DeviceId, OpenDevice>>>,
    stall_sequence_end: Arc<AtomicBool>,
    clock: SensorClock,
}

/// In-process camera stack: synthetic sensors driven by background threads.
///
/// Cloning yields another handle to the same platform, so a test can keep
/// one clone for fault injection after moving another into a
/// `DeviceRegistry`.
#[derive(Clone)]
pub struct VirtualCameraPlatform {
    inner: Arc<PlatformInner>,
}

impl VirtualCameraPlatform {
    pub fn new(config: VirtualCameraConfig) -> Result<Self, CameraError> {
        config.validate().map_err(CameraError::ConfigurationFailed)?;
        Ok(Self::from_valid(config))
    }

    /// Back and front camera with default timing.
    pub fn phone() -> Self {
        Self::from_valid(VirtualCameraConfig::phone())
    }

    fn from_valid(config: VirtualCameraConfig) -> Self {
        Self {
            inner: Arc::new(PlatformInner {
                devices: Mutex::new(config.devices.clone()),
                config,
                permissions: PermissionGate::granted(),
                initialized: AtomicBool::new(false),
                initialize_status: Mutex::new(None),
                open_rejections: Mutex::new(HashMap::new()),
                open: Arc::new(Mutex::new(HashMap::new())),
                stall_sequence_end: Arc::new(AtomicBool::new(false)),
                clock: SensorClock::new(),
            }),
        }
    }

    pub fn config(&self) -> &VirtualCameraConfig {
        &self.inner.config
    }

    pub fn permissions(&self) -> &PermissionGate {
        &self.inner.permissions
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Number of devices with a live connection.
    pub fn open_count(&self) -> usize {
        self.inner.open.lock().len()
    }

    /// Replace the cameras reported by the next enumeration.
    pub fn set_devices(&self, devices: Vec<Device>) {
        *self.inner.devices.lock() = devices;
    }

    /// Make `initialize` fail with `status`, or succeed again with `None`.
    pub fn set_initialize_status(&self, status: Option<PlatformStatus>) {
        *self.inner.initialize_status.lock() = status;
    }

    /// Refuse connections to `id` with `status`.
    pub fn reject_open(&self, id: DeviceId, status: PlatformStatus) {
        self.inner.open_rejections.lock().insert(id, status);
    }

    pub fn allow_open(&self, id: DeviceId) {
        self.inner.open_rejections.lock().remove(&id);
    }

    /// Simulate the device being unplugged or taken over. Returns false if
    /// `id` is not open.
    pub fn disconnect(&self, id: DeviceId) -> bool {
        let open = self.inner.open.lock();
        let Some(device) = open.get(&id) else {
            return false;
        };
        let callbacks = Arc::clone(&device.callbacks);
        device.shared.disconnect();
        drop(open);

        log::info!("virtual device {} disconnected", id);
        callbacks.on_disconnected(id);
        true
    }

    /// Report the next frame of `id` through `on_capture_failed`. Returns
    /// false if `id` is not open.
    pub fn fail_next_capture(&self, id: DeviceId) -> bool {
        match self.inner.open.lock().get(&id) {
            Some(device) => {
                device.shared.fail_next_capture();
                true
            }
            None => false,
        }
    }

    /// While set, sensor threads never report the end of their sequence.
    pub fn stall_sequence_end(&self, stall: bool) {
        self.inner.stall_sequence_end.store(stall, Ordering::SeqCst);
    }
}

impl Default for VirtualCameraPlatform {
    fn default() -> Self {
        Self::phone()
    }
}

impl CameraPlatform for VirtualCameraPlatform {
    fn has_permission(&self) -> bool {
        self.inner.permissions.is_granted()
    }

    fn initialize(&self) -> Result<(), PlatformStatus> {
        if let Some(status) = *self.inner.initialize_status.lock() {
            return Err(status);
        }
        if !self.inner.initialized.swap(true, Ordering::SeqCst) {
            log::debug!("virtual camera platform initialized");
        }
        Ok(())
    }

    fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformStatus> {
        if !self.is_initialized() {
            return Err(PlatformStatus::CameraService);
        }
        Ok(self.inner.devices.lock().clone())
    }

    fn open_device(
        &self,
        id: DeviceId,
        callbacks: Arc<dyn DeviceCallbacks>,
    ) -> Result<Box<dyn PlatformDevice>, PlatformStatus> {
        if !self.is_initialized() {
            return Err(PlatformStatus::CameraService);
        }
        if !self.has_permission() {
            return Err(PlatformStatus::PermissionDenied);
        }
        if let Some(status) = self.inner.open_rejections.lock().get(&id) {
            return Err(*status);
        }
        if !self.inner.devices.lock().iter().any(|d| d.id() == id) {
            return Err(PlatformStatus::InvalidParameter);
        }

        let shared = Arc::new(DeviceShared::new(id));
        {
            let mut open = self.inner.open.lock();
            if open.contains_key(&id) {
                return Err(PlatformStatus::CameraInUse);
            }
            open.insert(
                id,
                OpenDevice {
                    shared: Arc::clone(&shared),
                    callbacks,
                },
            );
        }

        let registry = Arc::clone(&self.inner.open);
        let on_close = Box::new(move |id: DeviceId| {
            registry.lock().remove(&id);
        });
        let config = &self.inner.config;
        let timing = SensorTiming {
            frame_interval: config.frame_interval,
            start_latency: config.start_latency,
        };

        log::debug!("virtual device {} opened", id);
        Ok(Box::new(VirtualDevice::new(
            shared,
            timing,
            self.inner.clock,
            config.buffer_slots,
            Arc::clone(&self.inner.stall_sequence_end),
            on_close,
        )))
    }

    fn shutdown(&self) {
        if self.inner.initialized.swap(false, Ordering::SeqCst) {
            log::debug!("virtual camera platform shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndcam_core::models::device::Facing;

    struct NoopCallbacks;

    impl DeviceCallbacks for NoopCallbacks {
        fn on_disconnected(&self, _device: DeviceId) {}
        fn on_error(&self, _device: DeviceId, _status: PlatformStatus) {}
    }

    fn initialized() -> VirtualCameraPlatform {
        let platform = VirtualCameraPlatform::phone();
        platform.initialize().unwrap();
        platform
    }

    #[test]
    fn enumeration_requires_initialize() {
        let platform = VirtualCameraPlatform::phone();
        assert_eq!(platform.enumerate_devices(), Err(PlatformStatus::CameraService));

        platform.initialize().unwrap();
        assert_eq!(platform.enumerate_devices().unwrap().len(), 2);

        platform.shutdown();
        assert!(!platform.is_initialized());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = VirtualCameraConfig::phone().with_buffer_slots(0);
        assert!(matches!(
            VirtualCameraPlatform::new(config),
            Err(CameraError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn open_and_close_tracks_connections() {
        let platform = initialized();
        let mut device = platform.open_device(DeviceId(0), Arc::new(NoopCallbacks)).unwrap();
        assert_eq!(platform.open_count(), 1);

        assert_eq!(
            platform.open_device(DeviceId(0), Arc::new(NoopCallbacks)).err(),
            Some(PlatformStatus::CameraInUse)
        );

        device.close();
        assert_eq!(platform.open_count(), 0);
    }

    #[test]
    fn open_faults() {
        let platform = initialized();
        assert_eq!(
            platform.open_device(DeviceId(9), Arc::new(NoopCallbacks)).err(),
            Some(PlatformStatus::InvalidParameter)
        );

        platform.reject_open(DeviceId(1), PlatformStatus::CameraDisabled);
        assert_eq!(
            platform.open_device(DeviceId(1), Arc::new(NoopCallbacks)).err(),
            Some(PlatformStatus::CameraDisabled)
        );
        platform.allow_open(DeviceId(1));
        assert!(platform.open_device(DeviceId(1), Arc::new(NoopCallbacks)).is_ok());

        platform.permissions().revoke();
        assert_eq!(
            platform.open_device(DeviceId(0), Arc::new(NoopCallbacks)).err(),
            Some(PlatformStatus::PermissionDenied)
        );
    }

    #[test]
    fn faults_need_open_device() {
        let platform = initialized();
        assert!(!platform.disconnect(DeviceId(0)));
        assert!(!platform.fail_next_capture(DeviceId(0)));

        platform.set_devices(vec![Device::new(DeviceId(3), Facing::External)]);
        assert_eq!(platform.enumerate_devices().unwrap()[0].id(), DeviceId(3));
    }

    #[test]
    fn initialize_fault() {
        let platform = VirtualCameraPlatform::phone();
        platform.set_initialize_status(Some(PlatformStatus::CameraService));
        assert_eq!(platform.initialize(), Err(PlatformStatus::CameraService));
        platform.set_initialize_status(None);
        assert!(platform.initialize().is_ok());
    }
}
