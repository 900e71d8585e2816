use crate::mailbox::MailboxStore;
use droplink_core::{PeerId, RoomId, SignalEnvelope};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Log-order selection of the messages addressed to `local` that it has not
/// processed yet. Pure so it is testable without timers or a live store.
pub fn select_inbox<'a>(log: &'a [SignalEnvelope], local: &PeerId) -> Vec<&'a SignalEnvelope> {
    log.iter()
        .filter(|m| m.to.includes(local) && m.from != *local && !m.processed_by.contains(local))
        .collect()
}

/// Periodic mailbox poller. Dispatches each selected message to the node
/// exactly once (in log order), then persists the processed-marks. Poll and
/// mark failures are logged and retried on the next tick; the local `seen`
/// set keeps a failed mark from turning into a duplicate dispatch.
pub struct Relay {
    store: Arc<dyn MailboxStore>,
    room: RoomId,
    local: PeerId,
    out: mpsc::Sender<SignalEnvelope>,
    poll_interval: Duration,
    seen: HashSet<u64>,
}

pub struct RelayHandle {
    nudge_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Request an immediate poll, e.g. right after a local append.
    pub fn nudge(&self) {
        let _ = self.nudge_tx.try_send(());
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Relay {
    pub fn spawn(
        store: Arc<dyn MailboxStore>,
        room: RoomId,
        local: PeerId,
        out: mpsc::Sender<SignalEnvelope>,
        poll_interval: Duration,
    ) -> RelayHandle {
        let (nudge_tx, nudge_rx) = mpsc::channel(1);
        let relay = Relay {
            store,
            room,
            local,
            out,
            poll_interval,
            seen: HashSet::new(),
        };
        let task = tokio::spawn(relay.run(nudge_rx));
        RelayHandle { nudge_tx, task }
    }

    async fn run(mut self, mut nudge_rx: mpsc::Receiver<()>) {
        debug!("relay started for room {} as {}", self.room, self.local);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                nudge = nudge_rx.recv() => {
                    if nudge.is_none() {
                        break;
                    }
                }
            }

            if !self.poll_once().await {
                break;
            }
        }

        debug!("relay stopped for room {}", self.room);
    }

    /// One poll cycle. Returns false only when the node side is gone.
    async fn poll_once(&mut self) -> bool {
        let room = match self.store.read_room(&self.room).await {
            Ok(room) => room,
            Err(e) => {
                warn!("mailbox poll failed, retrying next tick: {e}");
                return true;
            }
        };

        let mut dispatched = Vec::new();
        for msg in select_inbox(&room.messages, &self.local) {
            if self.seen.contains(&msg.seq) {
                continue;
            }
            if self.out.send(msg.clone()).await.is_err() {
                return false;
            }
            self.seen.insert(msg.seq);
            dispatched.push(msg.seq);
        }

        if !dispatched.is_empty() {
            if let Err(e) = self
                .store
                .mark_processed(&self.room, &dispatched, &self.local)
                .await
            {
                warn!(
                    "failed to persist {} processed-marks: {e}",
                    dispatched.len()
                );
            }
        }

        true
    }
}
