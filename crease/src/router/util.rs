use crease_core::CreaseError;
use rand::Rng;

/// Collapse per-source errors from one acquisition into a single error.
///
/// - No attempt at all means no source was active.
/// - Only timeouts collapse into `AllSourcesTimedOut`.
/// - Anything else keeps every individual error in `AllSourcesFailed`.
#[must_use]
pub fn collapse_errors(match_id: &str, errors: Vec<CreaseError>) -> CreaseError {
    if errors.is_empty() {
        return CreaseError::NoActiveSources;
    }
    if errors
        .iter()
        .all(|e| matches!(e, CreaseError::SourceTimeout { .. }))
    {
        return CreaseError::AllSourcesTimedOut {
            match_id: match_id.to_string(),
        };
    }
    CreaseError::AllSourcesFailed(errors)
}

/// `base_ms` plus a random extra of up to `jitter_percent` percent of it.
pub(crate) fn jitter_wait(base_ms: u64, jitter_percent: u32) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, (base_ms.saturating_mul(u64::from(jitter_percent))) / 100)
    };
    let mut rng = rand::rng();
    base_ms.saturating_add(rng.random_range(0..jitter_range))
}
