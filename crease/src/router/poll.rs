use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crease_core::{CreaseError, Snapshot};

use crate::Crease;
use crate::router::util::jitter_wait;

/// Extra delay added to each poll interval, as a percentage of it.
const POLL_JITTER_PERCENT: u32 = 10;
const POLL_CHANNEL_CAPACITY: usize = 16;

/// Handle to a running [`Crease::poll_match`] task.
///
/// Dropping the handle stops the task.
pub struct PollHandle {
    inner: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl PollHandle {
    /// Ask the poller to stop and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.inner.take() {
            let _ = h.await;
        }
    }

    /// Whether the poller has exited on its own.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.inner.take()
            && !h.is_finished()
        {
            h.abort();
        }
    }
}

impl Crease {
    /// Acquire a match now and then every `interval` (plus up to 10% jitter)
    /// until stopped.
    ///
    /// Every outcome is sent on the returned channel. The poller exits on
    /// its own once the match is no longer live or the receiver is dropped.
    /// Stopping while an acquisition is in flight cancels it.
    #[must_use]
    pub fn poll_match(
        self: &Arc<Self>,
        match_id: impl Into<String>,
        interval: Duration,
    ) -> (PollHandle, mpsc::Receiver<Result<Snapshot, CreaseError>>) {
        let (tx, rx) = mpsc::channel(POLL_CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let me = Arc::clone(self);
        let match_id = match_id.into();
        let base_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);

        let task = tokio::spawn(async move {
            loop {
                let res = tokio::select! {
                    _ = &mut stop_rx => break,
                    res = me.acquire(&match_id) => res,
                };
                let finished = matches!(res, Err(CreaseError::MatchNotLive { .. }));
                // a receiver that is kept but not drained must not block stop
                let sent = tokio::select! {
                    _ = &mut stop_rx => break,
                    sent = tx.send(res) => sent.is_ok(),
                };
                if !sent || finished {
                    #[cfg(feature = "tracing")]
                    tracing::info!(match_id = %match_id, finished, "poller exiting");
                    break;
                }
                let wait = Duration::from_millis(jitter_wait(base_ms, POLL_JITTER_PERCENT));
                tokio::select! {
                    _ = &mut stop_rx => break,
                    () = tokio::time::sleep(wait) => {}
                }
            }
        });

        (
            PollHandle {
                inner: Some(task),
                stop_tx: Some(stop_tx),
            },
            rx,
        )
    }
}
