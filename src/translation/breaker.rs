use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Process-lifetime circuit breaker for the primary provider.
///
/// Tripped once on the first quota/rate-limit error and never reset; a
/// restart clears it. Concurrent events may still see it untripped for calls
/// already in flight.
#[derive(Debug, Default)]
pub struct ProviderState {
    primary_exhausted: AtomicBool,
}

impl ProviderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tripped(&self) -> bool {
        self.primary_exhausted.load(Ordering::Relaxed)
    }

    /// Trip the breaker. Returns `true` only for the call that tripped it.
    pub fn trip(&self) -> bool {
        let first = !self.primary_exhausted.swap(true, Ordering::Relaxed);
        if first {
            warn!("Primary provider quota exhausted; skipping it for fallback tiers until restart");
        }
        first
    }
}
