//! crease-mock
//!
//! Deterministic stand-ins for the external world of the crease engine:
//! sources, pages, fetchers, and the backend. Used by the workspace tests and
//! by the runnable example.

use std::time::Duration;

use async_trait::async_trait;
use crease_core::{CreaseError, Field, Snapshot, SourceAdapter, SourceId, mark_network_issued};

mod backend;
mod dynamic;
/// Static fixture data.
pub mod fixtures;
mod page;

pub use backend::RecordingBackend;
pub use dynamic::{DynamicMockController, DynamicMockSource, MockBehavior};
pub use page::{FakeFetcher, FakePage};

/// Mock source for CI-safe examples. Serves fixture snapshots by match id.
///
/// Two match ids are special: `FAIL` fails with a network error and
/// `TIMEOUT` sleeps long enough to trip a short scrape timeout.
pub struct MockSource {
    id: SourceId,
    reliability: f64,
}

impl MockSource {
    /// Create a mock source with the given id and static reliability.
    #[must_use]
    pub fn new(id: impl Into<SourceId>, reliability: f64) -> Self {
        Self {
            id: id.into(),
            reliability,
        }
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn reliability(&self) -> f64 {
        self.reliability
    }

    async fn scrape(&self, match_id: &str) -> Result<Snapshot, CreaseError> {
        // every mock scrape stands in for a remote request
        mark_network_issued();
        match match_id {
            "FAIL" => Err(CreaseError::network(
                self.id.clone(),
                "forced failure: scrape",
            )),
            "TIMEOUT" => {
                // Keep short to avoid slowing tests excessively
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(fixtures::snapshots::live(match_id, &self.id, self.reliability))
            }
            other => fixtures::snapshots::by_match(other, &self.id, self.reliability)
                .ok_or_else(|| CreaseError::extraction(self.id.clone(), Field::Team1Name)),
        }
    }
}
