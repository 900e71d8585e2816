use async_trait::async_trait;
use bytes::Bytes;
use droplink_core::{ChannelMode, PeerId, TransportError};
use droplink_peer::{
    ChannelHandle, DynChannel, IceCandidate, PeerTransport, TransportEvent, TransportFactory,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// In-memory paired transport: offers carry an opaque token, answering a
/// token wires the two event channels together. Test fixture only; there is
/// no simulated-peer path in the runtime crates.
pub struct MockHub {
    pending: Mutex<HashMap<String, Endpoint>>,
    established: Mutex<HashMap<String, Arc<Link>>>,
    /// When false, neither side gets ChannelReady/Connected events; sessions
    /// stay pending so not-yet-open channel paths can be exercised.
    auto_open: bool,
    /// Per-message delay, for tests that need a transfer still in flight.
    send_delay: Option<Duration>,
}

impl MockHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            established: Mutex::new(HashMap::new()),
            auto_open: true,
            send_delay: None,
        })
    }

    pub fn with_manual_open() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            established: Mutex::new(HashMap::new()),
            auto_open: false,
            send_delay: None,
        })
    }

    pub fn with_send_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            established: Mutex::new(HashMap::new()),
            auto_open: true,
            send_delay: Some(delay),
        })
    }
}

struct Endpoint {
    events: mpsc::Sender<TransportEvent>,
    /// The peer this side is talking to.
    remote: PeerId,
}

struct Link {
    open: AtomicBool,
    /// side 0 = offerer, side 1 = answerer.
    sides: [Endpoint; 2],
    send_delay: Option<Duration>,
}

impl Link {
    async fn deliver_from(&self, side: usize, bytes: Bytes) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ChannelClosed);
        }
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }

        let receiver = &self.sides[1 - side];
        let sender_id = receiver.remote.clone();
        receiver
            .events
            .send(TransportEvent::Message(sender_id, bytes))
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        for side in &self.sides {
            let _ = side
                .events
                .send(TransportEvent::Disconnected(side.remote.clone()))
                .await;
        }
    }
}

pub struct MockTransportFactory {
    hub: Arc<MockHub>,
}

impl MockTransportFactory {
    pub fn new(hub: Arc<MockHub>) -> Self {
        Self { hub }
    }
}

fn dummy_candidate() -> IceCandidate {
    IceCandidate {
        candidate: "mock:0".to_owned(),
        sdp_mid: None,
        sdp_m_line_index: None,
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create_offerer(
        &self,
        remote: PeerId,
        _mode: ChannelMode,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(Box<dyn PeerTransport>, String), TransportError> {
        let token = PeerId::new().to_string();
        self.hub.pending.lock().unwrap().insert(
            token.clone(),
            Endpoint {
                events: events.clone(),
                remote: remote.clone(),
            },
        );

        // One trickled candidate so the candidate signaling path is covered.
        let _ = events
            .send(TransportEvent::CandidateGenerated(remote, dummy_candidate()))
            .await;

        let transport = MockTransport {
            hub: self.hub.clone(),
            token: token.clone(),
        };
        Ok((Box::new(transport), token))
    }

    async fn create_answerer(
        &self,
        remote: PeerId,
        remote_offer: String,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(Box<dyn PeerTransport>, String), TransportError> {
        let offerer_end = self
            .hub
            .pending
            .lock()
            .unwrap()
            .remove(&remote_offer)
            .ok_or_else(|| TransportError::Failed(format!("unknown offer {remote_offer}")))?;

        let link = Arc::new(Link {
            open: AtomicBool::new(true),
            sides: [
                offerer_end,
                Endpoint {
                    events: events.clone(),
                    remote: remote.clone(),
                },
            ],
            send_delay: self.hub.send_delay,
        });
        self.hub
            .established
            .lock()
            .unwrap()
            .insert(remote_offer.clone(), link.clone());

        let _ = events
            .send(TransportEvent::CandidateGenerated(
                remote.clone(),
                dummy_candidate(),
            ))
            .await;

        if self.hub.auto_open {
            let channel: DynChannel = Arc::new(MockChannel {
                link: link.clone(),
                side: 1,
            });
            let _ = events
                .send(TransportEvent::ChannelReady(remote.clone(), channel))
                .await;
            let _ = events.send(TransportEvent::Connected(remote)).await;
        }

        let transport = MockTransport {
            hub: self.hub.clone(),
            token: remote_offer.clone(),
        };
        Ok((Box::new(transport), remote_offer))
    }
}

struct MockTransport {
    hub: Arc<MockHub>,
    token: String,
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn apply_answer(&self, sdp: String) -> Result<(), TransportError> {
        if sdp != self.token {
            return Err(TransportError::Failed("answer does not match offer".into()));
        }
        let link = self
            .hub
            .established
            .lock()
            .unwrap()
            .get(&self.token)
            .cloned()
            .ok_or_else(|| TransportError::Failed("no connection for answer".into()))?;

        if self.hub.auto_open {
            let end = &link.sides[0];
            let channel: DynChannel = Arc::new(MockChannel {
                link: link.clone(),
                side: 0,
            });
            let _ = end
                .events
                .send(TransportEvent::ChannelReady(end.remote.clone(), channel))
                .await;
            let _ = end
                .events
                .send(TransportEvent::Connected(end.remote.clone()))
                .await;
        }
        Ok(())
    }

    async fn add_remote_candidate(&self, _candidate: IceCandidate) -> Result<(), TransportError> {
        // Paired in memory: candidates carry no routing information here.
        Ok(())
    }

    async fn close(&self) {
        self.hub.pending.lock().unwrap().remove(&self.token);
        let link = self
            .hub
            .established
            .lock()
            .unwrap()
            .get(&self.token)
            .cloned();
        if let Some(link) = link {
            link.close().await;
        }
    }
}

struct MockChannel {
    link: Arc<Link>,
    side: usize,
}

#[async_trait]
impl ChannelHandle for MockChannel {
    fn is_open(&self) -> bool {
        self.link.open.load(Ordering::SeqCst)
    }

    async fn send(&self, bytes: Bytes) -> Result<(), TransportError> {
        self.link.deliver_from(self.side, bytes).await
    }
}
