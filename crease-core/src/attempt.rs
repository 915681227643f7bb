//! Whether a scrape got as far as putting a request on the wire.
//!
//! The orchestrator runs every scrape inside an [`AttemptTracker`]; transports
//! call [`mark_network_issued`] right before sending. A scrape dropped before
//! that point (for example while waiting out a rate limit) is not a failure of
//! the source.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

tokio::task_local! {
    static NETWORK_ISSUED: Arc<AtomicBool>;
}

/// Observes one scrape attempt.
#[derive(Debug, Clone, Default)]
pub struct AttemptTracker {
    issued: Arc<AtomicBool>,
}

impl AttemptTracker {
    /// Fresh tracker; nothing issued yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `fut` with this tracker installed for the current task.
    pub async fn track<F: Future>(&self, fut: F) -> F::Output {
        NETWORK_ISSUED.scope(Arc::clone(&self.issued), fut).await
    }

    /// Whether the tracked scrape issued a network request.
    #[must_use]
    pub fn network_issued(&self) -> bool {
        self.issued.load(Ordering::Acquire)
    }
}

/// Note that the running attempt is about to send a request.
///
/// A no-op outside a tracked attempt.
pub fn mark_network_issued() {
    let _ = NETWORK_ISSUED.try_with(|flag| flag.store(true, Ordering::Release));
}
