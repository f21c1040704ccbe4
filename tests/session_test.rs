//! End-to-end tests driving two peer instances against each other

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use peerchat::connection::{Dialer, Listener, PeerEvent, PeerTable};

struct Instance {
    table: Arc<PeerTable>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    port: u16,
    _shutdown_tx: broadcast::Sender<()>,
}

async fn start_instance() -> Instance {
    let (events_tx, events) = mpsc::unbounded_channel();
    let table = PeerTable::new(10, 256, events_tx);
    let listener = Listener::bind(Arc::clone(&table), 0).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (shutdown_tx, _) = broadcast::channel(1);
    tokio::spawn(listener.run(shutdown_tx.subscribe()));
    Instance {
        table,
        events,
        port,
        _shutdown_tx: shutdown_tx,
    }
}

async fn next_event(instance: &mut Instance) -> PeerEvent {
    timeout(Duration::from_secs(2), instance.events.recv())
        .await
        .expect("timed out waiting for peer event")
        .expect("event channel closed")
}

/// Dials from `b` to `a` and waits until both sides registered the link.
async fn link(a: &mut Instance, b: &Instance) -> SocketAddr {
    let dialer = Dialer::new(Arc::clone(&b.table));
    let id = dialer
        .dial("127.0.0.1".parse().unwrap(), a.port)
        .await
        .unwrap();
    assert_eq!(id, 1);
    match next_event(a).await {
        PeerEvent::Accepted { peer } => peer,
        other => panic!("expected accept event, got {other:?}"),
    }
}

#[tokio::test]
async fn connect_is_visible_on_both_sides() {
    let mut a = start_instance().await;
    let b = start_instance().await;

    let b_source = link(&mut a, &b).await;

    // B recorded the address it dialed: A's listening port.
    let b_list = b.table.list().await;
    assert_eq!(b_list, vec![(1, SocketAddr::from(([127, 0, 0, 1], a.port)))]);

    // A recorded B's ephemeral source port.
    let a_list = a.table.list().await;
    assert_eq!(a_list, vec![(1, b_source)]);
    assert_ne!(b_source.port(), a.port);
}

#[tokio::test]
async fn send_delivers_message_with_sender_endpoint() {
    let mut a = start_instance().await;
    let b = start_instance().await;
    let b_source = link(&mut a, &b).await;

    b.table.send_by_id(1, b"hello").await.unwrap();

    match next_event(&mut a).await {
        PeerEvent::Message { peer, text } => {
            assert_eq!(text, "hello");
            assert_eq!(peer, b_source);
        }
        other => panic!("expected message event, got {other:?}"),
    }

    // Delivery leaves both tables unchanged.
    assert_eq!(a.table.len().await, 1);
    assert_eq!(b.table.len().await, 1);
}

#[tokio::test]
async fn explicit_terminate_empties_both_tables() {
    let mut a = start_instance().await;
    let b = start_instance().await;
    link(&mut a, &b).await;

    b.table.terminate_by_id(1).await.unwrap();
    assert!(b.table.is_empty().await);

    match next_event(&mut a).await {
        PeerEvent::Terminated { id: 1, .. } => {}
        other => panic!("expected terminated event, got {other:?}"),
    }
    assert!(a.table.is_empty().await);
}

#[tokio::test]
async fn abrupt_peer_exit_reports_unexpected_close() {
    let mut a = start_instance().await;

    let raw = TcpStream::connect(("127.0.0.1", a.port)).await.unwrap();
    match next_event(&mut a).await {
        PeerEvent::Accepted { .. } => {}
        other => panic!("expected accept event, got {other:?}"),
    }

    // Socket closed without any terminate notice.
    drop(raw);

    match next_event(&mut a).await {
        PeerEvent::Closed { id: 1, .. } => {}
        other => panic!("expected closed event, got {other:?}"),
    }
    assert!(a.table.is_empty().await);
}

#[tokio::test]
async fn terminate_text_is_never_delivered_as_chat() {
    let mut a = start_instance().await;
    let mut b = start_instance().await;
    link(&mut a, &b).await;

    // A chat message whose entire content is the control token reads as a
    // close signal on the receiving side, never as a displayed message.
    b.table.send_by_id(1, b"terminate").await.unwrap();

    match next_event(&mut a).await {
        PeerEvent::Terminated { .. } => {}
        other => panic!("terminate payload should read as a close signal, got {other:?}"),
    }
    assert!(a.table.is_empty().await);

    // A's teardown closes the stream, which B observes as an unexpected close.
    match next_event(&mut b).await {
        PeerEvent::Closed { .. } => {}
        other => panic!("expected closed event on the sender, got {other:?}"),
    }
    assert!(b.table.is_empty().await);
}
