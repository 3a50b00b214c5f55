use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::CameraConfiguration;
use crate::models::device::{Device, DeviceId, Facing};
use crate::models::error::CameraError;
use crate::models::status::PlatformStatus;
use crate::traits::camera_platform::CameraPlatform;
use crate::traits::capture_callbacks::DeviceCallbacks;

use super::device_handle::{DeviceHandle, DeviceLink};

struct RegistryInner {
    initialized: bool,
    devices: Vec<Device>,
}

/// Entry point: initializes the camera subsystem, enumerates devices and
/// opens them.
///
/// Generic over the platform backend so it can drive real hardware or the
/// virtual platform used in tests. A device id may be open through at most
/// one [`DeviceHandle`] at a time; the reservation is dropped when the handle
/// closes.
pub struct DeviceRegistry<P: CameraPlatform> {
    platform: P,
    config: CameraConfiguration,
    inner: Mutex<RegistryInner>,
    open_devices: Arc<Mutex<HashSet<DeviceId>>>,
}

impl<P: CameraPlatform> DeviceRegistry<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            config: CameraConfiguration::default(),
            inner: Mutex::new(RegistryInner {
                initialized: false,
                devices: Vec::new(),
            }),
            open_devices: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_config(platform: P, config: CameraConfiguration) -> Result<Self, CameraError> {
        config.validate().map_err(CameraError::ConfigurationFailed)?;
        let mut registry = Self::new(platform);
        registry.config = config;
        Ok(registry)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &CameraConfiguration {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Start the camera subsystem and take the first device snapshot.
    ///
    /// Idempotent. An empty device list is not an error here; it surfaces
    /// from [`list_devices`](Self::list_devices).
    pub fn init(&self) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        if inner.initialized {
            return Ok(());
        }

        if !self.platform.has_permission() {
            log::error!("camera permission not granted");
            return Err(CameraError::SubsystemUnavailable(
                "camera permission not granted".into(),
            ));
        }
        self.platform.initialize().map_err(|status| {
            log::error!("camera subsystem failed to start: {}", status);
            CameraError::SubsystemUnavailable(status.to_string())
        })?;

        let devices = match self.enumerate() {
            Ok(devices) => devices,
            Err(status) => {
                self.platform.shutdown();
                return Err(CameraError::SubsystemUnavailable(status.to_string()));
            }
        };

        log::info!("camera subsystem ready: {} device(s)", devices.len());
        inner.devices = devices;
        inner.initialized = true;
        Ok(())
    }

    /// Snapshot of the devices present at the last enumeration.
    ///
    /// An empty snapshot triggers one re-enumeration, so a device attached
    /// after `init` can still be found.
    pub fn list_devices(&self) -> Result<Vec<Device>, CameraError> {
        let mut inner = self.inner.lock();
        if !inner.initialized {
            return Err(CameraError::NotInitialized);
        }
        if inner.devices.is_empty() {
            inner.devices = self
                .enumerate()
                .map_err(|status| CameraError::SubsystemUnavailable(status.to_string()))?;
        }
        if inner.devices.is_empty() {
            return Err(CameraError::NoDevicesFound);
        }
        Ok(inner.devices.clone())
    }

    pub fn device_count(&self) -> usize {
        self.inner.lock().devices.len()
    }

    /// First device with the given facing, if any.
    pub fn find(&self, facing: Facing) -> Result<Option<Device>, CameraError> {
        Ok(self
            .list_devices()?
            .into_iter()
            .find(|device| device.facing() == facing))
    }

    pub fn is_open(&self, id: DeviceId) -> bool {
        self.open_devices.lock().contains(&id)
    }

    /// Open `device` for capture.
    pub fn open(&self, device: &Device) -> Result<DeviceHandle, CameraError> {
        let id = device.id();
        if !id.is_valid() {
            return Err(CameraError::InvalidDevice(id));
        }

        let known = {
            let inner = self.inner.lock();
            if !inner.initialized {
                return Err(CameraError::NotInitialized);
            }
            inner.devices.iter().find(|d| d.id() == id).cloned()
        };
        let Some(device) = known else {
            log::warn!("open: device {} is not in the current snapshot", id);
            return Err(CameraError::DeviceUnavailable {
                id,
                status: PlatformStatus::InvalidParameter,
            });
        };

        if !self.open_devices.lock().insert(id) {
            return Err(CameraError::DeviceBusy(id));
        }

        let link = Arc::new(DeviceLink::new(id));
        match self
            .platform
            .open_device(id, Arc::clone(&link) as Arc<dyn DeviceCallbacks>)
        {
            Ok(connection) => {
                log::info!("opened device {} ({} facing)", id, device.facing());
                Ok(DeviceHandle::new(
                    device,
                    self.config.clone(),
                    connection,
                    link,
                    Arc::clone(&self.open_devices),
                ))
            }
            Err(status) => {
                self.open_devices.lock().remove(&id);
                log::error!("failed to open device {}: {}", id, status);
                Err(CameraError::DeviceUnavailable { id, status })
            }
        }
    }

    /// Tear down the subsystem. Handles still open keep working until
    /// closed; `init` may be called again afterwards.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        if !inner.initialized {
            return;
        }
        let still_open = self.open_devices.lock().len();
        if still_open > 0 {
            log::warn!("shutting down with {} device(s) still open", still_open);
        }
        inner.initialized = false;
        inner.devices.clear();
        self.platform.shutdown();
        log::info!("camera subsystem shut down");
    }

    fn enumerate(&self) -> Result<Vec<Device>, PlatformStatus> {
        let reported = self.platform.enumerate_devices()?;
        let mut seen = HashSet::new();
        let mut devices = Vec::with_capacity(reported.len());
        for device in reported {
            if !device.id().is_valid() || !seen.insert(device.id()) {
                log::warn!("ignoring device with invalid or duplicate id {}", device.id());
                continue;
            }
            log::debug!(
                "device {}: {} facing, {} stream configuration(s)",
                device.id(),
                device.facing(),
                device.stream_configurations().len()
            );
            for config in device.stream_configurations() {
                log::debug!(
                    "  {:?} {}x{} ({:?})",
                    config.format,
                    config.width,
                    config.height,
                    config.direction
                );
            }
            devices.push(device);
        }
        Ok(devices)
    }
}
