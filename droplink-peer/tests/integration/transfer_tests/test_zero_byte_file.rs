use crate::utils::{connect_pair, init_tracing, offer_of, spawn_peer, wait_for_event, MockHub};
use droplink_peer::{MemoryMailbox, PeerEvent};

#[tokio::test]
async fn test_zero_byte_file_completes_without_chunks() {
    init_tracing();

    let store = MemoryMailbox::new();
    let hub = MockHub::new();
    let mut a = spawn_peer(&store, &hub, "alpha");
    let mut b = spawn_peer(&store, &hub, "bravo");

    connect_pair(&mut a, &mut b).await;

    let id = a
        .node
        .send_file(b.id(), offer_of(0))
        .await
        .expect("send_file failed");

    let event = wait_for_event(&mut b.events, |e| {
        matches!(e, PeerEvent::IncomingFile { .. })
    })
    .await;
    let PeerEvent::IncomingFile { transfer } = event else {
        unreachable!();
    };
    assert_eq!(transfer.size, 0);
    assert_eq!(transfer.percent(), 100.0);

    // Straight to completed: no chunk, no progress event.
    let event = b.events.recv().await.expect("event channel closed");
    assert!(matches!(event, PeerEvent::TransferCompleted { .. }));

    let event = b.events.recv().await.expect("event channel closed");
    let PeerEvent::FileReceived { bytes, .. } = event else {
        panic!("expected file-received, got {event:?}");
    };
    assert!(bytes.is_empty());

    wait_for_event(&mut a.events, |e| {
        matches!(e, PeerEvent::TransferCompleted { id: done } if *done == id)
    })
    .await;
}
