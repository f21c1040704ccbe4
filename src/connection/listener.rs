//! Inbound Listener
//!
//! Accepts inbound TCP connections for the lifetime of the process and
//! registers each one in the peer table.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::table::{PeerEvent, PeerTable};
use crate::Result;

pub struct Listener {
    table: Arc<PeerTable>,
    inner: TcpListener,
}

impl Listener {
    /// Binds to all interfaces on `port`. The process cannot operate without
    /// its listening socket, so a bind failure is fatal at startup.
    pub async fn bind(table: Arc<PeerTable>, port: u16) -> Result<Self> {
        let inner = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind listening socket on port {port}"))?;
        info!("listening on {}", inner.local_addr()?);
        Ok(Self { table, inner })
    }

    /// Address the listener actually bound, useful when `port` was 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept loop. Runs until the shutdown broadcast fires or the socket
    /// fails unrecoverably; per-connection accept errors are logged and the
    /// loop keeps accepting.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok((stream, peer)) => {
                        self.table.emit(PeerEvent::Accepted { peer });
                        let (id, _) = Arc::clone(&self.table).insert(peer, stream).await;
                        debug!(%peer, id, "registered inbound connection");
                    }
                    Err(e) if is_transient(&e) => {
                        warn!("accept failed: {e}");
                    }
                    Err(e) => {
                        error!("listener socket failed: {e}");
                        return Err(e.into());
                    }
                },
                _ = shutdown.recv() => {
                    info!("listener shutting down");
                    return Ok(());
                }
            }
        }
    }
}

/// Accept errors caused by the remote end or a signal; the socket itself is
/// still good and the loop should keep going.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
