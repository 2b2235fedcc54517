//! Cooperative cancellation token
//!
//! One [`ShutdownToken`] is created at startup and cloned into the accept
//! loop and every connection worker. It is set exactly once (typically
//! from a signal handler's thread) and polled at every suspension point;
//! a worker parked in its receive backoff observes the trip within one
//! backoff interval and discards any partially staged write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Process-wide advisory cancellation flag, observed cooperatively.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Create an untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Only the first call has any effect; later calls
    /// are no-ops.
    pub fn trigger(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            info!("shutdown requested");
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
