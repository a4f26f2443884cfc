//! The shared "barrier clear" signal.
//!
//! One epoch owns a [`SignalOwner`]; every caller that registered an animation
//! during that epoch (or asked for the current barrier) holds a
//! [`BarrierSignal`] observing it. The owner settles exactly once.

use tokio::sync::watch;

/// Observer half of an epoch's "all animations done" signal.
#[derive(Debug, Clone)]
pub struct BarrierSignal {
    rx: watch::Receiver<bool>,
}

impl BarrierSignal {
    /// A signal that is already settled.
    pub fn settled() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self { rx }
    }

    /// Whether the epoch this signal observes has drained.
    pub fn is_settled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the observed epoch drains.
    ///
    /// Also returns if the owning barrier is dropped mid-epoch, since nothing
    /// can be gated on it any more.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|settled| *settled).await;
    }
}

/// Owner half; settles the signal for every observer at once.
#[derive(Debug)]
pub(crate) struct SignalOwner {
    tx: watch::Sender<bool>,
}

impl SignalOwner {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> BarrierSignal {
        BarrierSignal { rx: self.tx.subscribe() }
    }

    /// Settle the signal. Later calls are no-ops.
    pub(crate) fn settle(&self) {
        self.tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_settled_signal_is_settled() {
        assert!(BarrierSignal::settled().is_settled());
    }

    #[tokio::test]
    async fn test_settled_signal_wait_returns() {
        tokio::time::timeout(Duration::from_secs(1), BarrierSignal::settled().wait())
            .await
            .unwrap();
    }

    #[test]
    fn test_owner_settles_all_observers() {
        let owner = SignalOwner::new();
        let a = owner.subscribe();
        let b = owner.subscribe();
        assert!(!a.is_settled());
        assert!(!b.is_settled());

        owner.settle();
        assert!(a.is_settled());
        assert!(b.is_settled());
    }

    #[test]
    fn test_subscribe_after_settle_sees_settled() {
        let owner = SignalOwner::new();
        owner.settle();
        assert!(owner.subscribe().is_settled());
    }

    #[tokio::test]
    async fn test_wait_wakes_on_settle() {
        let owner = SignalOwner::new();
        let signal = owner.subscribe();
        let waiter = tokio::spawn(async move { signal.wait().await });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        owner.settle();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wait_returns_when_owner_dropped() {
        let owner = SignalOwner::new();
        let signal = owner.subscribe();
        drop(owner);
        tokio::time::timeout(Duration::from_secs(1), signal.wait()).await.unwrap();
        assert!(!signal.is_settled());
    }
}
