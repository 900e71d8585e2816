use crate::utils::{init_tracing, spawn_peer, wait_for_event, MockHub};
use droplink_core::{SignalPayload, SignalTarget};
use droplink_peer::{MailboxStore, MemoryMailbox, PeerEvent};

#[tokio::test]
async fn test_join_triggers_offer_and_connect() {
    init_tracing();

    let store = MemoryMailbox::new();
    let hub = MockHub::new();
    let mut a = spawn_peer(&store, &hub, "alpha");
    let mut b = spawn_peer(&store, &hub, "bravo");

    let room = a.node.create_room().await.expect("create_room failed");
    b.node
        .join_room(room.clone())
        .await
        .expect("join_room failed");

    // Display names travel with the signaling messages.
    let b_id = b.id();
    let connected = wait_for_event(&mut a.events, |e| {
        matches!(e, PeerEvent::PeerConnected { peer, .. } if *peer == b_id)
    })
    .await;
    let PeerEvent::PeerConnected { name, .. } = connected else {
        unreachable!();
    };
    assert_eq!(name.as_deref(), Some("bravo"));

    let a_id = a.id();
    let connected = wait_for_event(&mut b.events, |e| {
        matches!(e, PeerEvent::PeerConnected { peer, .. } if *peer == a_id)
    })
    .await;
    let PeerEvent::PeerConnected { name, .. } = connected else {
        unreachable!();
    };
    assert_eq!(name.as_deref(), Some("alpha"));

    // The peer that observed the join made the offer; the joiner answered.
    // The reverse assignment must never occur.
    let log = store.read_room(&room).await.unwrap().messages;
    let offers: Vec<_> = log
        .iter()
        .filter(|m| matches!(m.payload, SignalPayload::Offer { .. }))
        .collect();
    let answers: Vec<_> = log
        .iter()
        .filter(|m| matches!(m.payload, SignalPayload::Answer { .. }))
        .collect();

    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].from, a.id());
    assert_eq!(offers[0].to, SignalTarget::Peer(b.id()));

    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].from, b.id());
    assert_eq!(answers[0].to, SignalTarget::Peer(a.id()));

    assert!(offers[0].seq < answers[0].seq);
}
