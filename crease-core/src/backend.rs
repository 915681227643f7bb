use async_trait::async_trait;

use crate::{CreaseError, MatchFormat, Snapshot};

/// Backend state the engine reads from and writes accepted snapshots to.
///
/// The surrounding application persists scores and emits real-time events; the
/// engine only assumes `apply_update` is safe to call once per accepted snapshot.
#[async_trait]
pub trait MatchBackend: Send + Sync {
    /// Whether the match is still being played.
    async fn is_live(&self, match_id: &str) -> Result<bool, CreaseError>;

    /// Format of the match, if known. Defaults to unknown.
    async fn match_format(&self, _match_id: &str) -> Result<Option<MatchFormat>, CreaseError> {
        Ok(None)
    }

    /// Persist and broadcast an accepted snapshot.
    async fn apply_update(&self, snapshot: &Snapshot) -> Result<(), CreaseError>;
}
