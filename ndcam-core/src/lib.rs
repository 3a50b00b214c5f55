//! # ndcam-core
//!
//! Platform-agnostic camera core library.
//!
//! Provides the device registry, device handle lifecycle and the capture
//! session state machine. Platform backends implement the `CameraPlatform`
//! trait and plug into the generic `DeviceRegistry`; frames flow into any
//! `FrameSink`, such as the bounded `FrameQueue`.
//!
//! ## Architecture
//!
//! ```text
//! ndcam-core (this crate)
//! ├── traits/       ← CameraPlatform, PlatformDevice, CaptureCallbacks, FrameSink, SessionDelegate
//! ├── models/       ← CameraError, PlatformStatus, SessionState, Device, Frame, CameraConfiguration
//! ├── processing/   ← FrameQueue, BufferPool
//! └── session/      ← DeviceRegistry, DeviceHandle, CaptureSession
//! ```
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use ndcam_core::{DeviceRegistry, FrameQueue, StreamTarget, PixelFormat};
//!
//! let registry = DeviceRegistry::new(platform);
//! registry.init()?;
//! let device = registry.list_devices()?.remove(0);
//! let handle = registry.open(&device)?;
//!
//! let queue = Arc::new(FrameQueue::new(StreamTarget::new(PixelFormat::Yuv420_888, 1920, 1080), 4));
//! handle.repeat(queue.clone())?;
//! while let Some(frame) = queue.acquire_next() {
//!     frame.release();
//! }
//! handle.stop_repeat()?;
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::config::CameraConfiguration;
pub use models::device::{Device, DeviceId, Facing, PixelFormat, StreamConfiguration, StreamDirection, StreamTarget};
pub use models::diagnostics::SessionDiagnostics;
pub use models::error::CameraError;
pub use models::frame::Frame;
pub use models::request::{CaptureFailure, CaptureRequest, FailureReason, RequestId};
pub use models::state::{CaptureMode, HandleState, SessionState};
pub use models::status::PlatformStatus;
pub use processing::buffer_pool::{BufferPool, SlotLease};
pub use processing::frame_queue::FrameQueue;
pub use session::capture_session::CaptureSession;
pub use session::device_handle::DeviceHandle;
pub use session::registry::DeviceRegistry;
pub use traits::camera_platform::{CameraPlatform, PlatformDevice};
pub use traits::capture_callbacks::{CaptureCallbacks, DeviceCallbacks};
pub use traits::frame_sink::FrameSink;
pub use traits::session_delegate::SessionDelegate;
