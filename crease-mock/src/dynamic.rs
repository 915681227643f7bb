use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crease_core::{CreaseError, Snapshot, SourceAdapter, SourceId, mark_network_issued};

/// Instruction for how a call should behave for a given input.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(CreaseError),
    /// Hang indefinitely (simulate a timeout).
    Hang,
}

#[derive(Default)]
struct InternalState {
    rules: HashMap<String, MockBehavior<Snapshot>>,
    fallback: Option<MockBehavior<Snapshot>>,
    calls: HashMap<String, usize>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior of `scrape` for a specific match.
    pub async fn set_behavior(&self, match_id: &str, behavior: MockBehavior<Snapshot>) {
        let mut guard = self.state.lock().await;
        guard.rules.insert(match_id.to_string(), behavior);
    }

    /// Set the behavior used for matches without a specific rule.
    pub async fn set_default_behavior(&self, behavior: MockBehavior<Snapshot>) {
        let mut guard = self.state.lock().await;
        guard.fallback = Some(behavior);
    }

    /// Number of `scrape` calls seen for a match.
    pub async fn calls(&self, match_id: &str) -> usize {
        let guard = self.state.lock().await;
        guard.calls.get(match_id).copied().unwrap_or(0)
    }

    /// Number of `scrape` calls seen across all matches.
    pub async fn total_calls(&self) -> usize {
        let guard = self.state.lock().await;
        guard.calls.values().sum()
    }

    /// Clear all configured behaviors and call counts.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.rules.clear();
        guard.fallback = None;
        guard.calls.clear();
    }
}

/// A source that defers all behavior to an external controller.
pub struct DynamicMockSource {
    id: SourceId,
    reliability: f64,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockSource {
    /// Create a new dynamic mock source and its controller.
    #[must_use]
    pub fn new_with_controller(
        id: impl Into<SourceId>,
        reliability: f64,
    ) -> (Arc<dyn SourceAdapter>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self {
            id: id.into(),
            reliability,
            state,
        });
        (me as Arc<dyn SourceAdapter>, controller)
    }
}

#[async_trait]
impl SourceAdapter for DynamicMockSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn reliability(&self) -> f64 {
        self.reliability
    }

    async fn scrape(&self, match_id: &str) -> Result<Snapshot, CreaseError> {
        // Acquire behavior snapshot without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            *guard.calls.entry(match_id.to_string()).or_insert(0) += 1;
            guard
                .rules
                .get(match_id)
                .cloned()
                .or_else(|| guard.fallback.clone())
        };
        mark_network_issued();
        match behavior {
            Some(MockBehavior::Return(snapshot)) => Ok(snapshot),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => std::future::pending().await,
            None => Err(CreaseError::network(
                self.id.clone(),
                format!("no behavior configured for {match_id}"),
            )),
        }
    }
}
