use crate::utils::{connect_pair, init_tracing, offer_of, spawn_peer, wait_for_event, MockHub};
use droplink_core::{SignalDraft, SignalPayload, SignalTarget};
use droplink_peer::{MailboxStore, MemoryMailbox, PeerEvent};

#[tokio::test]
async fn test_bad_answer_closes_only_that_session() {
    init_tracing();

    let store = MemoryMailbox::new();
    let hub = MockHub::new();
    let mut a = spawn_peer(&store, &hub, "alpha");
    let mut b = spawn_peer(&store, &hub, "bravo");
    let mut c = spawn_peer(&store, &hub, "charlie");

    let room = connect_pair(&mut a, &mut b).await;

    c.node.join_room(room.clone()).await.unwrap();
    let c_id = c.id();
    wait_for_event(&mut a.events, |e| {
        matches!(e, PeerEvent::PeerConnected { peer, .. } if *peer == c_id)
    })
    .await;
    let a_id = a.id();
    wait_for_event(&mut c.events, |e| {
        matches!(e, PeerEvent::PeerConnected { peer, .. } if *peer == a_id)
    })
    .await;

    // An out-of-sequence answer from b: a's session with b is already
    // connected, so this must fail and close that session only.
    store
        .append_message(
            &room,
            SignalDraft {
                from: b.id(),
                to: SignalTarget::Peer(a.id()),
                payload: SignalPayload::Answer {
                    sdp: "out-of-sequence".into(),
                },
                from_name: None,
                timestamp_ms: 0,
            },
        )
        .await
        .unwrap();

    let b_id = b.id();
    let event = wait_for_event(&mut a.events, |e| {
        matches!(e, PeerEvent::NegotiationFailed { peer, .. } if *peer == b_id)
    })
    .await;
    assert!(matches!(event, PeerEvent::NegotiationFailed { .. }));

    // The session with c is untouched: a file still goes through.
    let offer = offer_of(1000);
    let original = offer.bytes.clone();
    a.node.send_file(c.id(), offer).await.expect("send_file failed");

    let event = wait_for_event(&mut c.events, |e| {
        matches!(e, PeerEvent::FileReceived { .. })
    })
    .await;
    let PeerEvent::FileReceived { bytes, .. } = event else {
        unreachable!();
    };
    assert_eq!(bytes, original);
}
