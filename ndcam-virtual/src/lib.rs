//! # ndcam-virtual
//!
//! Virtual camera backend for ndcam.
//!
//! Provides:
//! - `VirtualCameraPlatform`: `CameraPlatform` implementation with fault injection
//! - `VirtualDevice`: per-connection sensor threads producing synthetic frames
//! - `VirtualCameraConfig`: device table, frame timing and buffer slots
//! - `permissions`: run-time switchable camera permission
//!
//! ## Usage
//! ```ignore
//! use ndcam_core::DeviceRegistry;
//! use ndcam_virtual::VirtualCameraPlatform;
//!
//! let platform = VirtualCameraPlatform::phone();
//! let registry = DeviceRegistry::new(platform.clone());
//! registry.init()?;
//! let handle = registry.open(&registry.list_devices()?[0])?;
//! platform.disconnect(handle.id());
//! ```

pub mod config;
pub mod permissions;
pub mod virtual_device;
pub mod virtual_platform;

pub use config::VirtualCameraConfig;
pub use permissions::PermissionGate;
pub use virtual_device::VirtualDevice;
pub use virtual_platform::VirtualCameraPlatform;
