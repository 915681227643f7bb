use futures::StreamExt;
use tokio::time::Instant;

use crease_core::{
    AttemptTracker, CreaseError, MatchFormat, ScrapeOutcome, Snapshot, SourceId, check_structure,
};

use crate::Crease;
use crate::router::util::collapse_errors;

/// Records a failed attempt for a source whose scrape was dropped after its
/// request went out. Drops before that point leave health untouched.
struct AttemptGuard<'a> {
    crease: &'a Crease,
    source: Option<SourceId>,
    tracker: AttemptTracker,
}

impl AttemptGuard<'_> {
    fn disarm(mut self) {
        self.source = None;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.source.take()
            && self.tracker.network_issued()
        {
            self.crease.failover.update_health(
                &id,
                &ScrapeOutcome::Failure {
                    reason: "cancelled".to_string(),
                },
            );
            self.crease.metrics.source_finished(&id, false);
        }
    }
}

impl Crease {
    /// Acquire a validated snapshot of a live match and hand it to the backend.
    ///
    /// Behavior:
    /// - A match the backend reports as finished returns `MatchNotLive`
    ///   without scraping.
    /// - The current source is tried first, then every other active source
    ///   by rolling reliability. Each scrape has its own timeout and feeds
    ///   the failover controller.
    /// - With cross-checking on, one more active source is scraped as a
    ///   second opinion. Its failure is not fatal.
    /// - When reconciliation fails but prefers the second opinion, it is
    ///   reconciled again as the primary and applied if that passes.
    /// - The source whose snapshot is applied becomes the current source.
    ///
    /// # Errors
    /// `MatchNotLive`, `ReconciliationFailed`, a backend error, or the
    /// collapsed per-source errors when every source failed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "crease::acquire", skip(self))
    )]
    pub async fn acquire(&self, match_id: &str) -> Result<Snapshot, CreaseError> {
        if !self.backend.is_live(match_id).await? {
            return Err(CreaseError::MatchNotLive {
                match_id: match_id.to_string(),
            });
        }
        let format = self
            .backend
            .match_format(match_id)
            .await?
            .unwrap_or(self.cfg.reconcile.default_format);

        self.metrics.acquisition_started();
        let started = Instant::now();
        let out = self.acquire_live(match_id, format).await;
        match &out {
            Ok(_) => self.metrics.acquisition_succeeded(started.elapsed()),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(match_id, error = %_e, "acquisition failed");
                self.metrics.acquisition_failed();
            }
        }
        out
    }

    /// Acquire several matches concurrently, at most `max_concurrent_matches`
    /// at a time. Results come back in input order.
    pub async fn acquire_many(&self, match_ids: &[String]) -> Vec<(String, Result<Snapshot, CreaseError>)> {
        let limit = self.cfg.max_concurrent_matches.max(1);
        futures::stream::iter(match_ids.iter().cloned())
            .map(|id| async move {
                let res = self.acquire(&id).await;
                (id, res)
            })
            .buffered(limit)
            .collect()
            .await
    }

    async fn acquire_live(&self, match_id: &str, format: MatchFormat) -> Result<Snapshot, CreaseError> {
        let current = self
            .failover
            .current_source()
            .ok_or(CreaseError::NoActiveSources)?;
        let mut candidates = vec![current.clone()];
        candidates.extend(
            self.failover
                .active_by_reliability(std::slice::from_ref(&current)),
        );

        let mut attempted: Vec<SourceId> = Vec::new();
        let mut errors: Vec<CreaseError> = Vec::new();
        let mut primary = None;
        for id in candidates {
            attempted.push(id.clone());
            match self.scrape_with(&id, match_id, format).await {
                Ok(snap) => {
                    primary = Some(snap);
                    break;
                }
                Err(e) => errors.push(e),
            }
        }
        let Some(primary) = primary else {
            return Err(collapse_errors(match_id, errors));
        };

        let secondary = if self.cfg.cross_check {
            match self.failover.active_by_reliability(&attempted).first() {
                Some(id) => self.scrape_with(id, match_id, format).await.ok(),
                None => None,
            }
        } else {
            None
        };

        let mut result = self.reconciler.reconcile(&primary, secondary.as_ref());
        let mut chosen = primary;
        if !result.is_valid
            && let Some(other) = secondary
            && other.source == result.recommended_source
        {
            let retry = self.reconciler.reconcile(&other, Some(&chosen));
            if retry.is_valid {
                chosen = other;
            }
            result = retry;
        }
        if !result.is_valid {
            return Err(CreaseError::ReconciliationFailed {
                confidence: result.confidence,
                discrepancies: result.discrepancies,
            });
        }

        if chosen.source != current {
            let reason = errors.first().map_or_else(
                || format!("reconciliation preferred {}", chosen.source),
                |e| format!("{current}: {}", e.reason()),
            );
            self.failover.promote(&chosen.source, &reason)?;
        }

        self.backend.apply_update(&chosen).await?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            match_id,
            source = %chosen.source,
            confidence = result.confidence,
            "snapshot applied"
        );
        Ok(chosen)
    }

    /// One scrape with timeout, health, and metrics bookkeeping.
    async fn scrape_with(
        &self,
        id: &SourceId,
        match_id: &str,
        format: MatchFormat,
    ) -> Result<Snapshot, CreaseError> {
        let source = self
            .source(id)
            .ok_or_else(|| CreaseError::UnknownSource(id.to_string()))?;
        self.metrics.source_attempted(id);
        let tracker = AttemptTracker::new();
        let guard = AttemptGuard {
            crease: self,
            source: Some(id.clone()),
            tracker: tracker.clone(),
        };
        let started = Instant::now();
        let scrape = tracker.track(source.scrape(match_id));
        let res = match tokio::time::timeout(self.cfg.scrape_timeout, scrape).await {
            Ok(res) => res.and_then(|snap| reject_impossible(snap.with_format(format))),
            Err(_) => Err(CreaseError::source_timeout(id.clone(), self.cfg.scrape_timeout)),
        };
        guard.disarm();

        match res {
            Ok(snap) => {
                self.failover.update_health(
                    id,
                    &ScrapeOutcome::Success {
                        response_time: started.elapsed(),
                    },
                );
                self.metrics.source_finished(id, true);
                Ok(snap)
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(source = %id, match_id, error = %e, "scrape failed");
                self.failover.update_health(
                    id,
                    &ScrapeOutcome::Failure {
                        reason: e.reason().to_string(),
                    },
                );
                self.metrics.source_finished(id, false);
                Err(e)
            }
        }
    }
}

/// Impossible states under the match format (overs past the cap included)
/// disqualify the snapshot the same way an adapter's own check does.
fn reject_impossible(snap: Snapshot) -> Result<Snapshot, CreaseError> {
    let violations = check_structure(&snap, snap.format.max_overs());
    if violations.is_empty() {
        Ok(snap)
    } else {
        Err(CreaseError::invalid_data(
            snap.source.clone(),
            violations.into_iter().map(|(_, detail)| detail).collect(),
        ))
    }
}
