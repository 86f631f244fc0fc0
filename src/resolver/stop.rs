//! Cancellation of a resolver's pending read.

use std::sync::Arc;

use tokio::sync::watch;

/// Cancels the read a resolver is waiting on.
///
/// Stopping neither closes the transport nor fires a continuation. The
/// pending read completes with [`TransportError::Cancelled`] and the
/// resolver's ordinary failure path runs, once.
///
/// [`TransportError::Cancelled`]: crate::resolver::TransportError::Cancelled
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Request cancellation. Returns `true` only for the call that raised the
    /// flag; later calls are no-ops.
    pub fn stop(&self) -> bool {
        let already_stopped = self.tx.send_replace(true);
        !already_stopped
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolver side of the stop flag.
#[derive(Debug)]
pub(crate) struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Resolves once the flag is raised. If every handle is dropped without
    /// stopping, this never resolves.
    pub(crate) async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub(crate) fn stop_pair() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stop_is_idempotent() {
        let (handle, _signal) = stop_pair();
        assert!(!handle.is_stopped());
        assert!(handle.stop());
        assert!(!handle.stop());
        assert!(!handle.clone().stop());
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn signal_fires_after_stop() {
        let (handle, mut signal) = stop_pair();
        let waiter = tokio::spawn(async move { signal.stopped().await });
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal should fire")
            .unwrap();
    }

    #[tokio::test]
    async fn stop_before_wait_is_observed() {
        let (handle, mut signal) = stop_pair();
        handle.stop();
        tokio::time::timeout(Duration::from_millis(100), signal.stopped())
            .await
            .expect("flag raised earlier must be seen");
    }

    #[tokio::test]
    async fn dropped_handles_never_cancel() {
        let (handle, mut signal) = stop_pair();
        drop(handle);
        let waited = tokio::time::timeout(Duration::from_millis(50), signal.stopped()).await;
        assert!(waited.is_err());
    }
}
