//! Peer Connection Table
//!
//! The shared registry of live peer links. Every component funnels its
//! mutations through here: the listener and dialer insert, the command
//! executor removes and sends, and each receive loop removes its own entry
//! when the remote side goes away. One lock serializes all of it.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::debug;

use super::receiver;
use crate::config::Config;

/// Control token requesting peer-side teardown. Sent raw on the wire, so a
/// chat message consisting of exactly these bytes is indistinguishable from
/// the signal and is swallowed as a disconnect.
pub const TERMINATE_TOKEN: &[u8] = b"terminate";

/// Stable identity of one live connection.
///
/// Display ids are positional and shift whenever an earlier entry is removed;
/// this handle never changes and is what receive loops key their bookkeeping
/// by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Events produced by the table and its receive loops, consumed by the
/// console printer.
#[derive(Debug)]
pub enum PeerEvent {
    /// An inbound connection reached the listener.
    Accepted { peer: SocketAddr },
    /// A chat message arrived.
    Message { peer: SocketAddr, text: String },
    /// The remote side requested teardown with the terminate token.
    Terminated { id: usize, peer: SocketAddr },
    /// The stream closed or errored without a terminate token.
    Closed { id: usize, peer: SocketAddr },
}

/// Errors returned by table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// The display id is outside `1..=len`.
    #[error("no connection with id {0}")]
    NotFound(usize),
    /// Writing to the peer's transport failed.
    #[error("write to peer failed: {0}")]
    Io(#[from] std::io::Error),
}

struct Entry {
    conn: ConnId,
    peer: SocketAddr,
    writer: OwnedWriteHalf,
    /// Wakes the receive loop out of a blocked read when the entry is
    /// removed locally.
    closed: Arc<Notify>,
}

/// Registry of live peer connections.
///
/// Display ids are dense and positional: exactly `1..=len` after every
/// operation, renumbered on every removal. An id is therefore only valid at
/// the instant it was read; anything that acts across a suspension point must
/// key on [`ConnId`] instead. All operations run their whole
/// read-modify-write sequence under the one internal lock.
pub struct PeerTable {
    entries: Mutex<Vec<Entry>>,
    next_conn: AtomicU64,
    max_connections: usize,
    buffer_size: usize,
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerTable {
    pub fn new(
        max_connections: usize,
        buffer_size: usize,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(Vec::new()),
            next_conn: AtomicU64::new(1),
            max_connections,
            buffer_size,
            events,
        })
    }

    pub fn from_config(config: &Config, events: mpsc::UnboundedSender<PeerEvent>) -> Arc<Self> {
        Self::new(config.server.max_connections, config.server.buffer_size, events)
    }

    /// Appends a new connection and spawns its receive loop.
    ///
    /// The returned display id is the table length at insertion time; the
    /// [`ConnId`] stays valid for the life of the connection. The connection
    /// cap is deliberately not checked here — inbound peers are never
    /// rejected, and the dialer checks before connecting.
    pub async fn insert(self: Arc<Self>, peer: SocketAddr, stream: TcpStream) -> (usize, ConnId) {
        let conn = ConnId(self.next_conn.fetch_add(1, Ordering::Relaxed));
        let (reader, writer) = stream.into_split();
        let closed = Arc::new(Notify::new());

        let mut entries = self.entries.lock().await;
        entries.push(Entry {
            conn,
            peer,
            writer,
            closed: Arc::clone(&closed),
        });
        let id = entries.len();
        drop(entries);

        debug!(%conn, %peer, id, "registered connection");
        tokio::spawn(receiver::run(Arc::clone(&self), conn, reader, closed));
        (id, conn)
    }

    /// Snapshot of `(display id, endpoint)` pairs in table order. Empty means
    /// no active connections.
    pub async fn list(&self) -> Vec<(usize, SocketAddr)> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index + 1, entry.peer))
            .collect()
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn at_capacity(&self) -> bool {
        self.entries.lock().await.len() >= self.max_connections
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Closes and removes the connection at `id`, renumbering the entries
    /// after it. Does not notify the peer; see [`Self::terminate_by_id`].
    pub async fn remove_by_id(&self, id: usize) -> Result<SocketAddr, TableError> {
        let mut entries = self.entries.lock().await;
        if id == 0 || id > entries.len() {
            return Err(TableError::NotFound(id));
        }
        let entry = entries.remove(id - 1);
        let peer = entry.peer;
        close(entry).await;
        debug!(%peer, id, "removed connection");
        Ok(peer)
    }

    /// [`Self::remove_by_id`] preceded by a best-effort terminate token, all
    /// inside the same critical section so the id cannot shift between the
    /// write and the removal.
    pub async fn terminate_by_id(&self, id: usize) -> Result<SocketAddr, TableError> {
        let mut entries = self.entries.lock().await;
        if id == 0 || id > entries.len() {
            return Err(TableError::NotFound(id));
        }
        let mut entry = entries.remove(id - 1);
        if let Err(e) = entry.writer.write_all(TERMINATE_TOKEN).await {
            debug!(peer = %entry.peer, "terminate notice not delivered: {e}");
        }
        let peer = entry.peer;
        close(entry).await;
        debug!(%peer, id, "terminated connection");
        Ok(peer)
    }

    /// Removes an entry by its stable handle, with the same close semantics
    /// as [`Self::remove_by_id`]. Receive loops use this instead of their
    /// original display id, which other removals may have shifted. Returns
    /// the display id the entry held at removal, or `None` if someone else
    /// already removed it.
    pub async fn remove_by_handle(&self, conn: ConnId) -> Option<(usize, SocketAddr)> {
        let mut entries = self.entries.lock().await;
        let index = entries.iter().position(|entry| entry.conn == conn)?;
        let entry = entries.remove(index);
        let peer = entry.peer;
        close(entry).await;
        debug!(%conn, %peer, "removed connection by handle");
        Some((index + 1, peer))
    }

    /// Writes raw bytes to the connection at `id`. No framing, no
    /// terminator: the peer receives exactly these bytes.
    pub async fn send_by_id(&self, id: usize, bytes: &[u8]) -> Result<SocketAddr, TableError> {
        let mut entries = self.entries.lock().await;
        if id == 0 || id > entries.len() {
            return Err(TableError::NotFound(id));
        }
        let entry = &mut entries[id - 1];
        entry.writer.write_all(bytes).await?;
        Ok(entry.peer)
    }

    /// Endpoint for a handle, or `None` if the entry is gone.
    pub async fn endpoint_of(&self, conn: ConnId) -> Option<SocketAddr> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.conn == conn)
            .map(|entry| entry.peer)
    }

    pub(crate) fn emit(&self, event: PeerEvent) {
        // The printer can only be gone during process teardown.
        let _ = self.events.send(event);
    }

    pub(crate) fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// Shuts the write half down so the peer observes EOF, then wakes the
/// entry's receive loop out of its blocked read.
async fn close(mut entry: Entry) {
    if let Err(e) = entry.writer.shutdown().await {
        debug!(peer = %entry.peer, "socket shutdown failed: {e}");
    }
    entry.closed.notify_one();
}
