//! Shutdown coordination for the proxy.

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// The state is level-triggered: a task that subscribes after the trigger
/// still observes it. Subscribers are the listener, the reload controller
/// and every relay session.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Only the first call has an effect.
    pub fn trigger(&self) {
        let first = self.tx.send_if_modified(|triggered| !std::mem::replace(triggered, true));
        if first {
            tracing::info!(subscribers = self.tx.receiver_count(), "Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once shutdown has been signalled on `rx`, immediately if it
/// already was.
///
/// A dropped coordinator is not a shutdown request: if the sender goes away
/// without triggering, this future never resolves.
pub async fn signalled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|triggered| *triggered).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn subscribers_observe_trigger_once() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();

        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        tokio::time::timeout(Duration::from_secs(1), signalled(&mut a))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), signalled(&mut b))
            .await
            .unwrap();
        // The second trigger did not publish again.
        assert!(!a.has_changed().unwrap());
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), signalled(&mut late))
            .await
            .expect("trigger before subscribe was missed");
    }

    #[tokio::test]
    async fn dropped_coordinator_does_not_signal() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        drop(shutdown);

        let waited = tokio::time::timeout(Duration::from_millis(50), signalled(&mut rx)).await;
        assert!(waited.is_err());
    }
}
