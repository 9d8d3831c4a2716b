//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag asking a running scheduler to stop.
///
/// The flag is only checked between events, so a halted scheduler is always
/// in a consistent state and can be checkpointed or resumed.  Clones share
/// the flag; hand one to a signal handler or another thread.
#[derive(Clone, Debug, Default)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag so the next run continues.
    pub fn resume(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
