use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-permit gate allowing at most one rename run at a time
#[derive(Debug, Clone, Default)]
pub struct ProcessingGate {
    busy: Arc<AtomicBool>,
}

/// Held for the lifetime of a run; releases the gate when dropped
#[derive(Debug)]
pub struct ProcessingPermit {
    busy: Arc<AtomicBool>,
}

impl ProcessingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the permit, or `None` if a run is already active
    pub fn try_acquire(&self) -> Option<ProcessingPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_processing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for ProcessingPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Cooperative cancellation flag checked between items
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the token can be reused for the next run
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
