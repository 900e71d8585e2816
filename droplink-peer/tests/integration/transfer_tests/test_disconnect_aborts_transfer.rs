use crate::utils::{connect_pair, init_tracing, offer_of, spawn_peer, wait_for_event, MockHub};
use droplink_core::CHUNK_SIZE;
use droplink_peer::{MemoryMailbox, PeerEvent};
use std::time::Duration;

#[tokio::test]
async fn test_peer_disconnect_marks_in_flight_transfer_failed() {
    init_tracing();

    let store = MemoryMailbox::new();
    // Slow the channel down so the transfer is still running when the
    // remote side goes away.
    let hub = MockHub::with_send_delay(Duration::from_millis(5));
    let mut a = spawn_peer(&store, &hub, "alpha");
    let mut b = spawn_peer(&store, &hub, "bravo");

    connect_pair(&mut a, &mut b).await;

    let id = a
        .node
        .send_file(b.id(), offer_of(200 * CHUNK_SIZE))
        .await
        .expect("send_file failed");

    wait_for_event(&mut a.events, |e| {
        matches!(e, PeerEvent::TransferProgress { .. })
    })
    .await;

    b.node.disconnect().await;

    let event = wait_for_event(&mut a.events, |e| {
        matches!(
            e,
            PeerEvent::TransferFailed { .. } | PeerEvent::TransferCompleted { .. }
        )
    })
    .await;
    let PeerEvent::TransferFailed { id: failed, .. } = event else {
        panic!("transfer should have failed, got {event:?}");
    };
    assert_eq!(failed, id);
}
