// ============================================================
// Layer 3 — Cancellation Token
// ============================================================
// A cloneable flag shared between whoever wants training to stop
// (the Ctrl-C hook, a test) and the training loop, which polls it
// before every batch and after validation. Setting it is idempotent.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

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
}
