//! Run-wide cancellation signal

use tokio::sync::watch;

/// Triggers cancellation
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observes cancellation; cheap to clone
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    /// Cancels every signal created from this handle
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns a new signal observing this handle
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelSignal {
    /// A signal that is never cancelled
    pub fn never() -> Self {
        let (_handle, signal) = cancel_pair();
        signal
    }

    /// Returns true once cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, signal) = cancel_pair();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
        assert!(signal.is_cancelled());
        assert!(handle.signal().is_cancelled());
    }

    #[tokio::test]
    async fn test_never_does_not_resolve() {
        let signal = CancelSignal::never();
        assert!(!signal.is_cancelled());
        let result = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(result.is_err());
    }
}
