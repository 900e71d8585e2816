use crate::utils::{init_tracing, FlakyStore};
use droplink_core::{PeerId, RosterEntry, SignalDraft, SignalPayload, SignalTarget};
use droplink_peer::relay::Relay;
use droplink_peer::{MailboxStore, MemoryMailbox};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_relay_survives_a_store_outage() {
    init_tracing();

    let inner = MemoryMailbox::new();
    let sender = PeerId::new();
    let room = inner
        .create_room(
            RosterEntry {
                id: sender.clone(),
                name: None,
            },
            0,
        )
        .await
        .unwrap();

    for i in 0..3u64 {
        inner
            .append_message(
                &room,
                SignalDraft {
                    from: sender.clone(),
                    to: SignalTarget::Broadcast,
                    payload: SignalPayload::Join,
                    from_name: None,
                    timestamp_ms: i,
                },
            )
            .await
            .unwrap();
    }

    // The first five polls fail; delivery happens on the sixth.
    let flaky = FlakyStore::new(inner, 5);
    let local = PeerId::new();
    let (tx, mut rx) = mpsc::channel(16);
    let handle = Relay::spawn(
        Arc::new(flaky),
        room,
        local,
        tx,
        Duration::from_millis(10),
    );

    let mut seqs = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while seqs.len() < 3 {
            let envelope = rx.recv().await.expect("relay channel closed");
            seqs.push(envelope.seq);
        }
    })
    .await
    .expect("relay never recovered from the outage");

    handle.stop();
    assert_eq!(seqs, vec![0, 1, 2]);
}
