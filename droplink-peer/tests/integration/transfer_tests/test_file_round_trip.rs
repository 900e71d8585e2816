use crate::utils::{connect_pair, init_tracing, offer_of, spawn_peer, wait_for_event, MockHub};
use droplink_peer::{MemoryMailbox, PeerEvent};
use std::time::Duration;

/// The end-to-end scenario: a 40000-byte file over a 16 KiB chunk protocol
/// arrives as three chunks and reassembles byte-for-byte.
#[tokio::test]
async fn test_forty_kilobyte_file_round_trip() {
    init_tracing();

    let store = MemoryMailbox::new();
    let hub = MockHub::new();
    let mut a = spawn_peer(&store, &hub, "alpha");
    let mut b = spawn_peer(&store, &hub, "bravo");

    connect_pair(&mut a, &mut b).await;

    let offer = offer_of(40_000);
    let original = offer.bytes.clone();
    let id = a
        .node
        .send_file(b.id(), offer)
        .await
        .expect("send_file failed");

    let event = wait_for_event(&mut b.events, |e| {
        matches!(e, PeerEvent::IncomingFile { .. })
    })
    .await;
    let PeerEvent::IncomingFile { transfer } = event else {
        unreachable!();
    };
    assert_eq!(transfer.size, 40_000);
    assert_eq!(transfer.name, "payload.bin");

    // One progress report per chunk, non-decreasing, ending at exactly 100.
    let mut progress = Vec::new();
    let mut percents = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match b.events.recv().await.expect("event channel closed") {
                PeerEvent::TransferProgress {
                    bytes_transferred,
                    percent,
                    ..
                } => {
                    progress.push(bytes_transferred);
                    percents.push(percent);
                }
                PeerEvent::TransferCompleted { .. } => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
    })
    .await
    .expect("transfer did not complete");

    assert_eq!(progress, vec![16_384, 32_768, 40_000]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last().copied(), Some(100.0));

    let event = wait_for_event(&mut b.events, |e| {
        matches!(e, PeerEvent::FileReceived { .. })
    })
    .await;
    let PeerEvent::FileReceived { bytes, name, .. } = event else {
        unreachable!();
    };
    assert_eq!(name, "payload.bin");
    assert_eq!(bytes, original);

    // The sender reaches completed as well.
    wait_for_event(&mut a.events, |e| {
        matches!(e, PeerEvent::TransferCompleted { id: done } if *done == id)
    })
    .await;
}
