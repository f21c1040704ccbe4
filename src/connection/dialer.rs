//! Outbound Dialer

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::table::PeerTable;

/// Errors surfaced to the operator when an outbound connect cannot proceed.
#[derive(Debug, Error)]
pub enum DialError {
    /// The table already holds the maximum permitted connections; no socket
    /// was opened.
    #[error("connection limit reached ({limit})")]
    ConnectionLimitReached { limit: usize },
    /// The TCP connect failed; the table is left unchanged.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Establishes outbound connections and registers them in the table.
///
/// Dialer- and listener-initiated connections are symmetric once inserted.
/// The connection cap is enforced here and only here, so inbound peers are
/// never rejected.
pub struct Dialer {
    table: Arc<PeerTable>,
}

impl Dialer {
    pub fn new(table: Arc<PeerTable>) -> Self {
        Self { table }
    }

    pub async fn dial(&self, ip: IpAddr, port: u16) -> Result<usize, DialError> {
        if self.table.at_capacity().await {
            return Err(DialError::ConnectionLimitReached {
                limit: self.table.max_connections(),
            });
        }
        let addr = SocketAddr::new(ip, port);
        debug!(%addr, "dialing peer");
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| DialError::ConnectFailed { addr, source })?;
        let (id, _) = Arc::clone(&self.table).insert(addr, stream).await;
        info!(%addr, id, "connected to peer");
        Ok(id)
    }
}
