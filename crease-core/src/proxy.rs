//! Ranked egress proxy pool.

use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use crate::{ProxyPoolConfig, ProxyRecord};

/// Ranking snapshot of one proxy for the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyStat {
    /// Proxy and its counters.
    pub proxy: ProxyRecord,
    /// Ranking score (`success_weight * success_rate + reliability_weight * reliability`).
    pub score: f64,
    /// Whether the proxy is currently selectable.
    pub eligible: bool,
}

struct PoolEntry {
    record: ProxyRecord,
    consecutive_failures: u32,
}

struct PoolState {
    entries: Vec<PoolEntry>,
    cursor: usize,
    last_rotation: Instant,
}

/// Thread-safe pool of egress proxies.
///
/// Selection excludes proxies whose failure count reached `max_failures` and
/// ranks the rest by score. A rotation cursor walks the ranked list: zero is
/// the top-ranked proxy, each rotation moves one position down and wraps.
/// Rotation happens explicitly, on a fixed interval, or after a run of
/// consecutive failures on one proxy.
pub struct ProxyPool {
    config: ProxyPoolConfig,
    state: Mutex<PoolState>,
}

impl ProxyPool {
    /// Create a pool from an initial list of proxies.
    #[must_use]
    pub fn new(proxies: Vec<ProxyRecord>, config: ProxyPoolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState {
                entries: proxies
                    .into_iter()
                    .map(|record| PoolEntry {
                        record,
                        consecutive_failures: 0,
                    })
                    .collect(),
                cursor: 0,
                last_rotation: Instant::now(),
            }),
        }
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &ProxyPoolConfig {
        &self.config
    }

    fn score(&self, p: &ProxyRecord) -> f64 {
        self.config.success_weight * p.success_rate() + self.config.reliability_weight * p.reliability
    }

    fn is_eligible(&self, p: &ProxyRecord) -> bool {
        p.failure_count < self.config.max_failures
    }

    fn ranked<'a>(&self, entries: &'a [PoolEntry]) -> Vec<&'a ProxyRecord> {
        let mut eligible: Vec<&ProxyRecord> = entries
            .iter()
            .map(|e| &e.record)
            .filter(|p| self.is_eligible(p))
            .collect();
        eligible.sort_by(|a, b| self.score(b).total_cmp(&self.score(a)));
        eligible
    }

    /// Select a proxy for the next request, or `None` when nothing is eligible.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn next(&self) -> Option<ProxyRecord> {
        let mut st = self.state.lock().expect("mutex poisoned");
        let now = Instant::now();
        if now.duration_since(st.last_rotation) >= self.config.rotation_interval {
            st.cursor = st.cursor.wrapping_add(1);
            st.last_rotation = now;
        }
        let ranked = self.ranked(&st.entries);
        if ranked.is_empty() {
            return None;
        }
        Some(ranked[st.cursor % ranked.len()].clone())
    }

    /// `true` when the pool holds no proxies at all and direct connections are allowed.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn allows_direct(&self) -> bool {
        self.config.allow_direct && self.state.lock().expect("mutex poisoned").entries.is_empty()
    }

    /// Record a successful request through `proxy`.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn record_success(&self, proxy: &ProxyRecord) {
        let mut st = self.state.lock().expect("mutex poisoned");
        if let Some(e) = find(&mut st.entries, proxy) {
            e.record.success_count = e.record.success_count.saturating_add(1);
            e.consecutive_failures = 0;
        }
    }

    /// Record a failed request through `proxy`.
    ///
    /// A run of `rotate_after_consecutive_failures` failures rotates immediately.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn record_failure(&self, proxy: &ProxyRecord, reason: &str) {
        let mut st = self.state.lock().expect("mutex poisoned");
        let threshold = self.config.rotate_after_consecutive_failures.max(1);
        let rotate = match find(&mut st.entries, proxy) {
            Some(e) => {
                e.record.failure_count = e.record.failure_count.saturating_add(1);
                e.consecutive_failures += 1;
                if e.consecutive_failures >= threshold {
                    e.consecutive_failures = 0;
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(proxy = %proxy.endpoint(), reason, rotate, "proxy failure recorded");
        #[cfg(not(feature = "tracing"))]
        let _ = reason;
        if rotate {
            st.cursor = st.cursor.wrapping_add(1);
            st.last_rotation = Instant::now();
            #[cfg(feature = "tracing")]
            tracing::info!(proxy = %proxy.endpoint(), "rotating proxy after consecutive failures");
        }
    }

    /// Advance to the next-ranked proxy.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn rotate(&self) {
        let mut st = self.state.lock().expect("mutex poisoned");
        st.cursor = st.cursor.wrapping_add(1);
        st.last_rotation = Instant::now();
    }

    /// Clear every runtime counter, re-admitting excluded proxies.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn reset(&self) {
        let mut st = self.state.lock().expect("mutex poisoned");
        for e in &mut st.entries {
            e.record.success_count = 0;
            e.record.failure_count = 0;
            e.consecutive_failures = 0;
        }
        st.cursor = 0;
        st.last_rotation = Instant::now();
    }

    /// Add a proxy; an existing entry with the same endpoint is replaced.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn add(&self, proxy: ProxyRecord) {
        let mut st = self.state.lock().expect("mutex poisoned");
        st.entries.retain(|e| e.record.endpoint() != proxy.endpoint());
        st.entries.push(PoolEntry {
            record: proxy,
            consecutive_failures: 0,
        });
    }

    /// Remove a proxy. Returns `true` when something was removed.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn remove(&self, host: &str, port: u16) -> bool {
        let mut st = self.state.lock().expect("mutex poisoned");
        let before = st.entries.len();
        st.entries
            .retain(|e| !(e.record.host == host && e.record.port == port));
        st.entries.len() != before
    }

    /// Number of configured proxies, eligible or not.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expect("mutex poisoned").entries.len()
    }

    /// `true` when no proxies are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every proxy with its score, eligible ones first in rank order.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn stats(&self) -> Vec<ProxyStat> {
        let st = self.state.lock().expect("mutex poisoned");
        let mut out: Vec<ProxyStat> = st
            .entries
            .iter()
            .map(|e| ProxyStat {
                score: self.score(&e.record),
                eligible: self.is_eligible(&e.record),
                proxy: e.record.clone(),
            })
            .collect();
        out.sort_by(|a, b| {
            b.eligible
                .cmp(&a.eligible)
                .then_with(|| b.score.total_cmp(&a.score))
        });
        out
    }
}

fn find<'a>(entries: &'a mut [PoolEntry], proxy: &ProxyRecord) -> Option<&'a mut PoolEntry> {
    entries
        .iter_mut()
        .find(|e| e.record.host == proxy.host && e.record.port == proxy.port)
}
