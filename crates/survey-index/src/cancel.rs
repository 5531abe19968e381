//! Cooperative shutdown for long-running walks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag the host raises when it is shutting down.
///
/// The walker checks it before visiting each node, so a rebuild in progress
/// stops between files and the previous snapshot stays in place.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    raised: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let signal = ShutdownSignal::new();
        let handle = signal.clone();
        assert!(!handle.is_raised());
        signal.raise();
        assert!(handle.is_raised());
    }
}
