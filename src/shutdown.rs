//! Graceful Shutdown Handling
//!
//! Fans a single shutdown signal out to the listener and any other
//! background tasks, whether it came from the `exit` command or from the
//! operating system.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::Result;

pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    /// Receiver for components that must stop on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Broadcast shutdown to every subscriber.
    pub fn initiate(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("no shutdown subscribers listening: {e}");
        }
    }

    /// Resolves when SIGTERM, SIGINT, or Ctrl+C arrives, then broadcasts
    /// shutdown.
    pub async fn listen_for_signals(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.initiate();
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_signal_reaches_subscribers() {
        let coordinator = ShutdownCoordinator::new();
        let mut receiver = coordinator.subscribe();

        coordinator.initiate();

        assert!(receiver.recv().await.is_ok());
    }

    #[tokio::test]
    async fn late_subscribers_get_their_own_broadcast() {
        let coordinator = ShutdownCoordinator::new();
        let mut first = coordinator.subscribe();
        coordinator.initiate();
        assert!(first.recv().await.is_ok());

        let mut second = coordinator.subscribe();
        coordinator.initiate();
        assert!(second.recv().await.is_ok());
    }
}
