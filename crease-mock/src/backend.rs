use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crease_core::{CreaseError, MatchBackend, MatchFormat, Snapshot};

#[derive(Default)]
struct BackendState {
    finished: HashSet<String>,
    formats: HashMap<String, MatchFormat>,
    applied: Vec<Snapshot>,
    apply_error: Option<CreaseError>,
}

/// Backend that records applied snapshots. Every match is live unless marked finished.
#[derive(Default)]
pub struct RecordingBackend {
    state: Mutex<BackendState>,
}

impl RecordingBackend {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a match live or finished.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn set_live(&self, match_id: &str, live: bool) {
        let mut st = self.state.lock().expect("mutex poisoned");
        if live {
            st.finished.remove(match_id);
        } else {
            st.finished.insert(match_id.to_string());
        }
    }

    /// Report a known format for a match.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn set_format(&self, match_id: &str, format: MatchFormat) {
        let mut st = self.state.lock().expect("mutex poisoned");
        st.formats.insert(match_id.to_string(), format);
    }

    /// Make every following `apply_update` fail with `error` (`None` restores success).
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn fail_applies(&self, error: Option<CreaseError>) {
        self.state.lock().expect("mutex poisoned").apply_error = error;
    }

    /// Snapshots applied so far, oldest first.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn applied(&self) -> Vec<Snapshot> {
        self.state.lock().expect("mutex poisoned").applied.clone()
    }
}

#[async_trait]
impl MatchBackend for RecordingBackend {
    async fn is_live(&self, match_id: &str) -> Result<bool, CreaseError> {
        Ok(!self
            .state
            .lock()
            .expect("mutex poisoned")
            .finished
            .contains(match_id))
    }

    async fn match_format(&self, match_id: &str) -> Result<Option<MatchFormat>, CreaseError> {
        Ok(self
            .state
            .lock()
            .expect("mutex poisoned")
            .formats
            .get(match_id)
            .copied())
    }

    async fn apply_update(&self, snapshot: &Snapshot) -> Result<(), CreaseError> {
        let mut st = self.state.lock().expect("mutex poisoned");
        if let Some(e) = st.apply_error.clone() {
            return Err(e);
        }
        st.applied.push(snapshot.clone());
        Ok(())
    }
}
