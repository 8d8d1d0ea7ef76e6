//! Graceful shutdown on SIGTERM/SIGINT (Ctrl+C off Unix).
//!
//! Hosting platforms send SIGTERM before killing the process; axum stops
//! accepting connections and drains in-flight requests once the
//! [`ShutdownSignal`] resolves.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Owns the shutdown flag and hands out waiters.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Creates an untriggered shutdown flag.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Spawns a task that trips the flag on the first termination signal.
    pub fn listen_for_signals(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let name = termination().await;
            info!(signal = name, "shutting down");
            this.trigger();
        });
    }

    /// Trips the flag.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once the flag has been tripped.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a future-like handle that resolves when the flag trips.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Resolves once shutdown has been requested.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for shutdown. A dropped [`Shutdown`] also counts.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(unix)]
async fn termination() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut term), Ok(mut int)) => tokio::select! {
            _ = term.recv() => "SIGTERM",
            _ = int.recv() => "SIGINT",
        },
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "cannot install unix signal handlers; falling back to ctrl-c");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn termination() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; only an explicit trigger stops the server");
        std::future::pending::<()>().await;
    }
    "ctrl-c"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_trips_flag() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn waiter_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(shutdown.signal().wait());

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_millis(500), waiter).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn waiter_created_after_trigger_resolves() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_millis(50), shutdown.signal().wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn dropping_controller_releases_waiters() {
        let shutdown = Shutdown::new();
        let signal = shutdown.signal();
        drop(shutdown);

        let result = tokio::time::timeout(Duration::from_millis(50), signal.wait()).await;
        assert!(result.is_ok());
    }
}
