pub mod camera_platform;
pub mod capture_callbacks;
pub mod frame_sink;
pub mod session_delegate;
