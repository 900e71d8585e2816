use crate::utils::{init_tracing, offer_of, spawn_peer, MockHub};
use droplink_core::{PeerId, SendFileError, SignalPayload};
use droplink_peer::{MailboxStore, MemoryMailbox};
use std::time::Duration;

#[tokio::test]
async fn test_send_to_unknown_peer_fails_fast() {
    init_tracing();

    let store = MemoryMailbox::new();
    let hub = MockHub::new();
    let a = spawn_peer(&store, &hub, "alpha");

    a.node.create_room().await.expect("create_room failed");

    let err = a
        .node
        .send_file(PeerId::new(), offer_of(10))
        .await
        .unwrap_err();
    assert!(matches!(err, SendFileError::UnknownPeer(_)));
}

#[tokio::test]
async fn test_send_before_channel_open_fails_fast() {
    init_tracing();

    let store = MemoryMailbox::new();
    // Negotiation runs but no channel ever opens.
    let hub = MockHub::with_manual_open();
    let a = spawn_peer(&store, &hub, "alpha");
    let b = spawn_peer(&store, &hub, "bravo");

    let room = a.node.create_room().await.expect("create_room failed");
    b.node
        .join_room(room.clone())
        .await
        .expect("join_room failed");

    // Once a's offer is in the log its session for b exists.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let log = store.read_room(&room).await.unwrap().messages;
            let offered = log
                .iter()
                .any(|m| matches!(m.payload, SignalPayload::Offer { .. }) && m.from == a.id());
            if offered {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("offer never appeared");

    let err = a.node.send_file(b.id(), offer_of(10)).await.unwrap_err();
    assert!(matches!(err, SendFileError::ChannelNotReady(_)));
}
