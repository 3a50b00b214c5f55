pub mod config;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod request;
pub mod state;
pub mod status;
