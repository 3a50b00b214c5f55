//! Camera permission emulation.
//!
//! Real platforms gate camera access behind a user-facing consent. The
//! virtual platform models it as a switch that tests flip at run time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared camera permission switch. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    granted: Arc<AtomicBool>,
}

impl PermissionGate {
    pub fn granted() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn revoke(&self) {
        log::info!("camera permission revoked");
        self.granted.store(false, Ordering::SeqCst);
    }

    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::granted()
    }
}
