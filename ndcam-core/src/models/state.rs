use std::fmt;

/// Which kind of capture a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    SingleShot,
    Repeating,
}

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle ─capture─→ requesting(single) ─ack─→ single-shot ─frame/error─→ idle
/// idle ─repeat──→ requesting(repeat) ─ack─→ repeating ─stop─→ stopping ─ack─→ idle
///
/// any ─close of owning handle─→ idle (forced)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Submitted, not yet acknowledged by the platform.
    Requesting(CaptureMode),
    SingleShot,
    Repeating,
    Stopping,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_repeating(&self) -> bool {
        matches!(self, Self::Repeating | Self::Requesting(CaptureMode::Repeating))
    }

    pub fn is_single_shot(&self) -> bool {
        matches!(self, Self::SingleShot | Self::Requesting(CaptureMode::SingleShot))
    }

    /// States in which frames for the active request may still reach the sink.
    pub fn accepts_frames(&self) -> bool {
        !self.is_idle()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Requesting(CaptureMode::SingleShot) => f.write_str("requesting (single-shot)"),
            Self::Requesting(CaptureMode::Repeating) => f.write_str("requesting (repeating)"),
            Self::SingleShot => f.write_str("single-shot"),
            Self::Repeating => f.write_str("repeating"),
            Self::Stopping => f.write_str("stopping"),
        }
    }
}

/// Lifecycle of a `DeviceHandle`: `Open → Closed`, terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Open,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_predicates() {
        assert!(SessionState::Requesting(CaptureMode::Repeating).is_repeating());
        assert!(SessionState::Repeating.is_repeating());
        assert!(!SessionState::Stopping.is_repeating());
        assert!(SessionState::Requesting(CaptureMode::SingleShot).is_single_shot());
        assert!(!SessionState::Idle.accepts_frames());
        assert!(SessionState::Stopping.accepts_frames());
    }

    #[test]
    fn display_names() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(
            SessionState::Requesting(CaptureMode::Repeating).to_string(),
            "requesting (repeating)"
        );
    }
}
