//! Cooperative shutdown signal observed by retry loops and the trainer

use tokio::sync::watch;

/// Sending half, held by whoever handles the operator interrupt
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Every [`Shutdown`] clone observes it.
    pub fn trigger(&self) {
        // send_replace never fails, even with no receivers left
        self.tx.send_replace(true);
    }
}

/// Receiving half, cheap to clone into every component that may block
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a linked trigger/signal pair
    #[must_use]
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// A signal that never fires
    #[must_use]
    pub fn never() -> Shutdown {
        // A dropped trigger leaves the value at `false` forever.
        Self::channel().1
    }

    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested
    ///
    /// If the trigger is dropped without firing this never resolves.
    pub async fn triggered(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Return `Err(Cancelled)` if shutdown was requested
    pub fn check(&self) -> crate::Result<()> {
        if self.is_triggered() {
            Err(crate::DqnError::Cancelled)
        } else {
            Ok(())
        }
    }
}
