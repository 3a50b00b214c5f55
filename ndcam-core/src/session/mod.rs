pub mod capture_session;
pub mod device_handle;
pub mod registry;
