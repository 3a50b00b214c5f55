use serde::{Deserialize, Serialize};

/// Counters for debugging a capture session.
///
/// `attempts()` counts every frame the platform tried to produce; the gap to
/// `frames_delivered` is made of expected, non-error drops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    pub requests_submitted: u64,
    pub frames_delivered: u64,
    /// Frames the sink refused because it was full.
    pub frames_rejected: u64,
    /// Frames for stale requests, after a forced stop, or out of order.
    pub frames_discarded: u64,
    /// Frames the producer could not fill because no buffer slot was free.
    pub buffers_lost: u64,
    pub capture_failures: u64,
    pub sequences_completed: u64,
    pub sequences_aborted: u64,
    pub close_timeouts: u64,
}

impl SessionDiagnostics {
    pub fn attempts(&self) -> u64 {
        self.frames_delivered
            + self.frames_rejected
            + self.frames_discarded
            + self.buffers_lost
            + self.capture_failures
    }

    pub fn dropped(&self) -> u64 {
        self.frames_rejected + self.buffers_lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_cover_every_outcome() {
        let d = SessionDiagnostics {
            frames_delivered: 10,
            frames_rejected: 2,
            frames_discarded: 1,
            buffers_lost: 3,
            capture_failures: 1,
            ..Default::default()
        };
        assert_eq!(d.attempts(), 17);
        assert_eq!(d.dropped(), 5);
    }

    #[test]
    fn serializes_as_flat_counters() {
        let d = SessionDiagnostics {
            frames_delivered: 3,
            close_timeouts: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["frames_delivered"], 3);
        assert_eq!(json["close_timeouts"], 1);

        let back: SessionDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }
}
