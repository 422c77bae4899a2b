use std::sync::Arc;

use tokio::sync::watch;

/// One-shot "client ready" signal; every remote call waits on it.
#[derive(Clone)]
pub struct Readiness {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(false)),
        }
    }
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        if self.is_ready() {
            return;
        }
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn waiters_resume_once_ready() {
        let readiness = Readiness::new();
        assert!(!readiness.is_ready());

        let waiter = tokio::spawn({
            let readiness = readiness.clone();
            async move { readiness.wait().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        readiness.mark_ready();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();

        // already ready: returns immediately
        readiness.wait().await;
    }
}
