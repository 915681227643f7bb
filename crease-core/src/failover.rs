//! Source health bookkeeping and the pull-based "current source" decision.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{CreaseError, FailoverConfig, FailoverEvent, ScrapeOutcome, SourceHealth, SourceId};

struct SourceEntry {
    health: SourceHealth,
    /// Registration or last re-enable time; staleness of a source that never
    /// succeeded is measured from here.
    armed_at: DateTime<Utc>,
}

#[derive(Default)]
struct FailoverState {
    sources: Vec<SourceEntry>,
    current: Option<SourceId>,
    history: VecDeque<FailoverEvent>,
    total_failovers: u64,
}

/// Tracks per-source health and decides which source is current.
///
/// There is no background timer: every call to
/// [`current_source`](FailoverController::current_source) re-evaluates the
/// current source and switches at most once.
pub struct FailoverController {
    config: FailoverConfig,
    state: Mutex<FailoverState>,
}

impl FailoverController {
    /// Create an empty controller.
    #[must_use]
    pub fn new(config: FailoverConfig) -> Self {
        Self {
            config,
            state: Mutex::new(FailoverState::default()),
        }
    }

    /// Controller configuration.
    #[must_use]
    pub const fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Register a source with its static reliability prior. Re-registering
    /// an existing source leaves its health untouched.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn register(&self, source: SourceId, reliability: f64) {
        let mut st = self.state.lock().expect("mutex poisoned");
        if st.sources.iter().any(|e| e.health.source == source) {
            return;
        }
        st.sources.push(SourceEntry {
            health: SourceHealth::new(source, reliability),
            armed_at: Utc::now(),
        });
    }

    fn is_healthy(&self, e: &SourceEntry, now: DateTime<Utc>) -> bool {
        if !e.health.is_active
            || e.health.consecutive_error_count > self.config.max_consecutive_errors
        {
            return false;
        }
        let since = e.health.last_success.map_or(e.armed_at, |t| t.max(e.armed_at));
        let timeout = chrono::Duration::from_std(self.config.failover_timeout)
            .unwrap_or(chrono::Duration::MAX);
        now - since <= timeout
    }

    fn unhealthy_reason(&self, e: &SourceEntry, now: DateTime<Utc>) -> String {
        if !e.health.is_active {
            "disabled".to_string()
        } else if e.health.consecutive_error_count > self.config.max_consecutive_errors {
            format!(
                "{} consecutive errors (max {})",
                e.health.consecutive_error_count, self.config.max_consecutive_errors
            )
        } else {
            let since = e.health.last_success.map_or(e.armed_at, |t| t.max(e.armed_at));
            format!("no success for {}s", (now - since).num_seconds())
        }
    }

    /// Best candidate other than `excluding`: active, most recent success, then
    /// higher reliability. With `healthy_only` unhealthy sources are skipped.
    fn best<'a>(
        &self,
        sources: &'a [SourceEntry],
        excluding: Option<&SourceId>,
        healthy_only: bool,
        now: DateTime<Utc>,
    ) -> Option<&'a SourceEntry> {
        sources
            .iter()
            .filter(|e| e.health.is_active)
            .filter(|e| excluding != Some(&e.health.source))
            .filter(|e| !healthy_only || self.is_healthy(e, now))
            .max_by(|a, b| {
                a.health
                    .last_success
                    .cmp(&b.health.last_success)
                    .then_with(|| a.health.reliability.total_cmp(&b.health.reliability))
                    // earlier registration wins a full tie
                    .then(std::cmp::Ordering::Greater)
            })
    }

    fn switch(
        &self,
        st: &mut FailoverState,
        from: SourceId,
        to: SourceId,
        reason: String,
        now: DateTime<Utc>,
    ) -> FailoverEvent {
        let event = FailoverEvent {
            from,
            to: to.clone(),
            reason,
            timestamp: now,
        };
        #[cfg(feature = "tracing")]
        tracing::warn!(from = %event.from, to = %event.to, reason = %event.reason, "source failover");
        st.current = Some(to);
        st.history.push_back(event.clone());
        while st.history.len() > self.config.history_limit {
            st.history.pop_front();
        }
        st.total_failovers += 1;
        event
    }

    /// Current source, switching to a healthier one first if needed.
    ///
    /// Returns `None` only when no source is active.
    #[must_use]
    pub fn current_source(&self) -> Option<SourceId> {
        self.current_source_at(Utc::now())
    }

    /// [`current_source`](Self::current_source) evaluated at an explicit instant.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn current_source_at(&self, now: DateTime<Utc>) -> Option<SourceId> {
        let mut st = self.state.lock().expect("mutex poisoned");
        let current = st
            .current
            .clone()
            .and_then(|id| st.sources.iter().position(|e| e.health.source == id));
        let Some(idx) = current else {
            let first = self
                .best(&st.sources, None, true, now)
                .or_else(|| self.best(&st.sources, None, false, now))
                .map(|e| e.health.source.clone());
            st.current.clone_from(&first);
            return first;
        };

        let entry = &st.sources[idx];
        if self.is_healthy(entry, now) {
            return Some(entry.health.source.clone());
        }
        let from = entry.health.source.clone();
        let reason = self.unhealthy_reason(entry, now);
        let replacement = self
            .best(&st.sources, Some(&from), true, now)
            .or_else(|| {
                // a disabled source must be left even for an unhealthy one
                if entry.health.is_active {
                    None
                } else {
                    self.best(&st.sources, Some(&from), false, now)
                }
            })
            .map(|e| e.health.source.clone());
        match replacement {
            Some(to) => {
                self.switch(&mut st, from, to.clone(), reason, now);
                Some(to)
            }
            None if st.sources[idx].health.is_active => Some(from),
            None => {
                st.current = None;
                None
            }
        }
    }

    /// Record the outcome of a scrape.
    pub fn update_health(&self, source: &SourceId, outcome: &ScrapeOutcome) {
        self.update_health_at(source, outcome, Utc::now());
    }

    /// [`update_health`](Self::update_health) with an explicit timestamp.
    ///
    /// Outcomes for unregistered sources are ignored.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn update_health_at(&self, source: &SourceId, outcome: &ScrapeOutcome, now: DateTime<Utc>) {
        let alpha = self.config.reliability_smoothing.clamp(0.0, 1.0);
        let mut st = self.state.lock().expect("mutex poisoned");
        let Some(entry) = st.sources.iter_mut().find(|e| &e.health.source == source) else {
            return;
        };
        let h = &mut entry.health;
        match outcome {
            ScrapeOutcome::Success { response_time } => {
                h.last_success = Some(now);
                h.consecutive_error_count = 0;
                h.success_count += 1;
                h.average_response_time =
                    incremental_mean(h.average_response_time, *response_time, h.success_count);
                h.reliability = (1.0 - alpha).mul_add(h.reliability, alpha);
            }
            ScrapeOutcome::Failure { reason } => {
                h.last_error = Some(now);
                h.consecutive_error_count = h.consecutive_error_count.saturating_add(1);
                h.error_count += 1;
                h.reliability *= 1.0 - alpha;
                #[cfg(feature = "tracing")]
                tracing::debug!(source = %source, reason = %reason, consecutive = h.consecutive_error_count, "source failure recorded");
                #[cfg(not(feature = "tracing"))]
                let _ = reason;
            }
        }
    }

    /// Best candidate other than `excluding`, preferring healthy sources.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn next_source(&self, excluding: Option<&SourceId>) -> Option<SourceId> {
        let now = Utc::now();
        let st = self.state.lock().expect("mutex poisoned");
        self.best(&st.sources, excluding, true, now)
            .or_else(|| self.best(&st.sources, excluding, false, now))
            .map(|e| e.health.source.clone())
    }

    /// Active sources not in `excluding`, by rolling reliability descending.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn active_by_reliability(&self, excluding: &[SourceId]) -> Vec<SourceId> {
        let st = self.state.lock().expect("mutex poisoned");
        let mut active: Vec<&SourceHealth> = st
            .sources
            .iter()
            .map(|e| &e.health)
            .filter(|h| h.is_active && !excluding.contains(&h.source))
            .collect();
        active.sort_by(|a, b| b.reliability.total_cmp(&a.reliability));
        active.into_iter().map(|h| h.source.clone()).collect()
    }

    /// Remove a source from candidacy until re-enabled.
    ///
    /// # Errors
    /// Returns `UnknownSource` when the source is not registered.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn disable(&self, source: &SourceId) -> Result<(), CreaseError> {
        let mut st = self.state.lock().expect("mutex poisoned");
        let entry = find_mut(&mut st.sources, source)?;
        entry.health.is_active = false;
        #[cfg(feature = "tracing")]
        tracing::info!(source = %source, "source disabled");
        Ok(())
    }

    /// Re-enable a source and reset its error counter.
    ///
    /// # Errors
    /// Returns `UnknownSource` when the source is not registered.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn enable(&self, source: &SourceId) -> Result<(), CreaseError> {
        let mut st = self.state.lock().expect("mutex poisoned");
        let entry = find_mut(&mut st.sources, source)?;
        entry.health.is_active = true;
        entry.health.consecutive_error_count = 0;
        entry.armed_at = Utc::now();
        #[cfg(feature = "tracing")]
        tracing::info!(source = %source, "source enabled");
        Ok(())
    }

    /// Move away from the current source regardless of its health.
    ///
    /// Returns the recorded event, or `None` when there is no other active source.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn force_failover(&self, reason: &str) -> Option<FailoverEvent> {
        let now = Utc::now();
        let mut st = self.state.lock().expect("mutex poisoned");
        let from = st.current.clone()?;
        let to = self
            .best(&st.sources, Some(&from), true, now)
            .or_else(|| self.best(&st.sources, Some(&from), false, now))
            .map(|e| e.health.source.clone())?;
        Some(self.switch(&mut st, from, to, reason.to_string(), now))
    }

    /// Make `to` the current source after it served an acquisition the
    /// current source could not.
    ///
    /// Returns the recorded event, or `None` when `to` already is current.
    ///
    /// # Errors
    /// Returns `UnknownSource` when `to` is not registered and `InvalidConfig`
    /// when it is disabled.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn promote(&self, to: &SourceId, reason: &str) -> Result<Option<FailoverEvent>, CreaseError> {
        let now = Utc::now();
        let mut st = self.state.lock().expect("mutex poisoned");
        let entry = find_mut(&mut st.sources, to)?;
        if !entry.health.is_active {
            return Err(CreaseError::InvalidConfig(format!("source {to} is disabled")));
        }
        match st.current.clone() {
            Some(from) if &from != to => Ok(Some(self.switch(&mut st, from, to.clone(), reason.to_string(), now))),
            Some(_) => Ok(None),
            None => {
                st.current = Some(to.clone());
                Ok(None)
            }
        }
    }

    /// Health of every registered source, in registration order.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn health(&self) -> Vec<SourceHealth> {
        let st = self.state.lock().expect("mutex poisoned");
        st.sources.iter().map(|e| e.health.clone()).collect()
    }

    /// Health of one source.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn source_health(&self, source: &SourceId) -> Option<SourceHealth> {
        let st = self.state.lock().expect("mutex poisoned");
        st.sources
            .iter()
            .find(|e| &e.health.source == source)
            .map(|e| e.health.clone())
    }

    /// Up to `limit` most recent failover events, oldest first.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<FailoverEvent> {
        let st = self.state.lock().expect("mutex poisoned");
        let skip = st.history.len().saturating_sub(limit);
        st.history.iter().skip(skip).cloned().collect()
    }

    /// Failovers since creation, including those evicted from the history.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn failover_count(&self) -> u64 {
        self.state.lock().expect("mutex poisoned").total_failovers
    }
}

fn find_mut<'a>(sources: &'a mut [SourceEntry], id: &SourceId) -> Result<&'a mut SourceEntry, CreaseError> {
    sources
        .iter_mut()
        .find(|e| &e.health.source == id)
        .ok_or_else(|| CreaseError::UnknownSource(id.to_string()))
}

fn incremental_mean(mean: Duration, sample: Duration, n: u64) -> Duration {
    if n <= 1 {
        return sample;
    }
    let mean = i128::try_from(mean.as_nanos()).unwrap_or(i128::MAX);
    let sample = i128::try_from(sample.as_nanos()).unwrap_or(i128::MAX);
    let next = mean + (sample - mean) / i128::from(n);
    Duration::from_nanos(u64::try_from(next.max(0)).unwrap_or(u64::MAX))
}
