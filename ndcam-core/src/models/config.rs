use std::time::Duration;

/// Configuration shared by the registry and every handle it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfiguration {
    /// Upper bound `close()` waits for the platform to acknowledge the end of
    /// the in-flight sequence (default: 500 ms).
    pub close_timeout: Duration,

    /// Reject capture targets the device does not advertise (default: true).
    pub validate_stream_targets: bool,
}

impl CameraConfiguration {
    pub const MAX_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn validate(&self) -> Result<(), String> {
        if self.close_timeout.is_zero() {
            return Err("close timeout must be positive".into());
        }
        if self.close_timeout > Self::MAX_CLOSE_TIMEOUT {
            return Err(format!(
                "close timeout {:?} exceeds maximum of {:?}",
                self.close_timeout,
                Self::MAX_CLOSE_TIMEOUT
            ));
        }
        Ok(())
    }
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            close_timeout: Duration::from_millis(500),
            validate_stream_targets: true,
        }
    }
}
