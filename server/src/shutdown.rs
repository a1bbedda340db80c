use tokio::sync::watch;

/// Fires the shutdown. Dropping it also counts as shutdown.
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Handed to every loop; checked before each read and each tick.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn shutdown(&self) {
        // Err only means every receiver is gone already.
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once shutdown has been requested. Cancel-safe.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let (trigger, mut shutdown) = channel();
        assert!(!shutdown.is_shutdown());

        let waiter = tokio::spawn(async move {
            shutdown.wait().await;
            shutdown.is_shutdown()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.shutdown();

        let observed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(observed);
    }

    #[tokio::test]
    async fn dropping_trigger_counts_as_shutdown() {
        let (trigger, mut shutdown) = channel();
        drop(trigger);
        assert!(shutdown.is_shutdown());
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
            .await
            .unwrap();
    }

    #[test]
    fn clones_all_observe() {
        let (trigger, shutdown) = channel();
        let other = shutdown.clone();
        trigger.shutdown();
        assert!(shutdown.is_shutdown());
        assert!(other.is_shutdown());
    }
}
