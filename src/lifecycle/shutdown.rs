//! Shutdown coordination.
//!
//! The signal is latched: a [`ShutdownSignal`] taken after [`Shutdown::trigger`]
//! resolves immediately, so a server started late still stops.

use std::sync::Arc;

use tokio::sync::watch;

/// Trigger side of graceful shutdown. Clones share one signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// A future-producing handle for the server or a background task.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request shutdown. Later calls are no-ops.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
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

/// Receiving side handed to whatever must stop on shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered or every [`Shutdown`] handle is gone.
    pub async fn recv(mut self) {
        // Err means the trigger side was dropped; nobody can stop us later.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}
