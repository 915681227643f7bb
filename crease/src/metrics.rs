use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use crease_core::{AcquisitionMetrics, SourceId};

/// Counters behind [`Crease::metrics`](crate::Crease::metrics).
#[derive(Default)]
pub(crate) struct MetricsRecorder {
    inner: Mutex<AcquisitionMetrics>,
}

impl MetricsRecorder {
    fn with<R>(&self, f: impl FnOnce(&mut AcquisitionMetrics) -> R) -> R {
        let mut m = self.inner.lock().expect("mutex poisoned");
        f(&mut m)
    }

    pub(crate) fn acquisition_started(&self) {
        self.with(|m| m.total_attempts += 1);
    }

    pub(crate) fn acquisition_succeeded(&self, latency: Duration) {
        self.with(|m| {
            m.successful += 1;
            #[allow(clippy::cast_precision_loss)]
            let n = m.successful as f64;
            let sample = latency.as_secs_f64() * 1000.0;
            m.average_latency_ms += (sample - m.average_latency_ms) / n;
            m.last_success_at = Some(Utc::now());
        });
    }

    pub(crate) fn acquisition_failed(&self) {
        self.with(|m| {
            m.failed += 1;
            m.last_failure_at = Some(Utc::now());
        });
    }

    pub(crate) fn source_attempted(&self, source: &SourceId) {
        self.with(|m| m.per_source.entry(source.clone()).or_default().attempts += 1);
    }

    pub(crate) fn source_finished(&self, source: &SourceId, ok: bool) {
        self.with(|m| {
            let c = m.per_source.entry(source.clone()).or_default();
            if ok {
                c.successes += 1;
            } else {
                c.failures += 1;
            }
        });
    }

    /// Copy of the counters with the controller's failover total filled in.
    pub(crate) fn snapshot(&self, failovers: u64) -> AcquisitionMetrics {
        let mut out = self.with(|m| m.clone());
        out.failovers = failovers;
        out
    }
}
