//! Per-Connection Receive Loop
//!
//! One loop per live connection, spawned at insert time. It owns the read
//! half of the stream outright and reacts to three outcomes per read: stream
//! closed or errored (implicit remote terminate), the literal terminate
//! token (explicit remote terminate), or anything else (a chat message).

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::table::{ConnId, PeerEvent, PeerTable, TERMINATE_TOKEN};

pub(crate) async fn run(
    table: Arc<PeerTable>,
    conn: ConnId,
    mut reader: OwnedReadHalf,
    closed: Arc<Notify>,
) {
    let mut buf = BytesMut::with_capacity(table.buffer_size());
    loop {
        buf.clear();
        let read = tokio::select! {
            read = reader.read_buf(&mut buf) => read,
            _ = closed.notified() => {
                debug!(%conn, "receive loop stopped, connection removed locally");
                return;
            }
        };

        // Other removals may have renumbered the table while this task was
        // parked in the read; the handle is the only identity safe to trust
        // here. Gone means someone else already tore this entry down.
        let Some(peer) = table.endpoint_of(conn).await else {
            debug!(%conn, "receive loop exiting, entry already gone");
            return;
        };

        match read {
            Ok(0) => {
                if let Some((id, peer)) = table.remove_by_handle(conn).await {
                    info!(%peer, "peer closed the stream");
                    table.emit(PeerEvent::Closed { id, peer });
                }
                return;
            }
            Ok(_) if &buf[..] == TERMINATE_TOKEN => {
                if let Some((id, peer)) = table.remove_by_handle(conn).await {
                    debug!(%peer, "received terminate token");
                    table.emit(PeerEvent::Terminated { id, peer });
                }
                return;
            }
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf).into_owned();
                table.emit(PeerEvent::Message { peer, text });
            }
            Err(e) => {
                if let Some((id, peer)) = table.remove_by_handle(conn).await {
                    warn!(%peer, "read failed, dropping connection: {e}");
                    table.emit(PeerEvent::Closed { id, peer });
                }
                return;
            }
        }
    }
}
