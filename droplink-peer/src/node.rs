use crate::events::PeerEvent;
use crate::mailbox::MailboxStore;
use crate::relay::{Relay, RelayHandle};
use crate::session::{NegotiationState, PeerSession, Role};
use crate::transfer::{self, FileOffer, InboundTransfer, TransferUpdate};
use crate::transport::{IceCandidate, TransportEvent, TransportFactory};
use bytes::Bytes;
use droplink_core::{
    ChannelMode, ChannelPacket, FileTransfer, PeerId, RoomId, RosterEntry, SendFileError,
    SignalDraft, SignalEnvelope, SignalPayload, SignalTarget, StoreError, TransferDirection,
    TransferId, TransferStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct NodeConfig {
    /// Display name announced to other peers (shown on their side when the
    /// connection comes up). None is valid.
    pub display_name: Option<String>,
    /// Mailbox poll interval for the signaling relay.
    pub poll_interval: Duration,
    /// Delivery mode requested for the data channel. File transfer is only
    /// correct over `Reliable`.
    pub channel_mode: ChannelMode,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            display_name: None,
            poll_interval: Duration::from_secs(2),
            channel_mode: ChannelMode::Reliable,
        }
    }
}

enum Command {
    CreateRoom {
        reply: oneshot::Sender<Result<RoomId, StoreError>>,
    },
    JoinRoom {
        room: RoomId,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    SendFile {
        peer: PeerId,
        offer: FileOffer,
        reply: oneshot::Sender<Result<TransferId, SendFileError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap cloneable handle to a running peer node.
#[derive(Clone)]
pub struct NodeHandle {
    local: PeerId,
    cmd_tx: mpsc::Sender<Command>,
}

impl NodeHandle {
    pub fn local_id(&self) -> &PeerId {
        &self.local
    }

    /// Creates a room with the local peer as the sole roster entry and
    /// starts relaying. Returns once the mailbox write succeeds.
    pub async fn create_room(&self) -> Result<RoomId, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::CreateRoom { reply: tx })
            .await
            .map_err(|_| node_stopped())?;
        rx.await.map_err(|_| node_stopped())?
    }

    /// Appends the local peer to the room roster, announces the join, and
    /// starts relaying. Returns once the mailbox writes succeed; the actual
    /// connection setup happens asynchronously from here.
    pub async fn join_room(&self, room: RoomId) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::JoinRoom { room, reply: tx })
            .await
            .map_err(|_| node_stopped())?;
        rx.await.map_err(|_| node_stopped())?
    }

    /// Starts sending a file to a connected peer. Fails fast when there is
    /// no session or its channel is not open yet.
    pub async fn send_file(
        &self,
        peer: PeerId,
        offer: FileOffer,
    ) -> Result<TransferId, SendFileError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SendFile {
                peer,
                offer,
                reply: tx,
            })
            .await
            .map_err(|_| SendFileError::NodeClosed)?;
        rx.await.map_err(|_| SendFileError::NodeClosed)?
    }

    /// Announces departure (best effort), stops the relay, closes every
    /// session, and terminates the node task.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Disconnect { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}

fn node_stopped() -> StoreError {
    StoreError::Unavailable("peer node is shut down".into())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The per-process peer actor. All session and transfer state transitions
/// run on this single event loop, which serializes them per remote peer;
/// the chunk loops of individual transfers run as their own tasks.
pub struct PeerNode {
    local: PeerId,
    config: NodeConfig,
    store: Arc<dyn MailboxStore>,
    factory: Arc<dyn TransportFactory>,

    room: Option<RoomId>,
    relay: Option<RelayHandle>,
    sessions: HashMap<PeerId, PeerSession>,
    transfers: HashMap<TransferId, FileTransfer>,

    cmd_rx: mpsc::Receiver<Command>,
    signal_rx: mpsc::Receiver<SignalEnvelope>,
    signal_tx: mpsc::Sender<SignalEnvelope>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    update_rx: mpsc::UnboundedReceiver<TransferUpdate>,
    update_tx: mpsc::UnboundedSender<TransferUpdate>,

    events: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerNode {
    pub fn start(
        store: Arc<dyn MailboxStore>,
        factory: Arc<dyn TransportFactory>,
        config: NodeConfig,
    ) -> (NodeHandle, mpsc::UnboundedReceiver<PeerEvent>) {
        let local = PeerId::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::channel(256);
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let node = PeerNode {
            local: local.clone(),
            config,
            store,
            factory,
            room: None,
            relay: None,
            sessions: HashMap::new(),
            transfers: HashMap::new(),
            cmd_rx,
            signal_rx,
            signal_tx,
            transport_rx,
            transport_tx,
            update_rx,
            update_tx,
            events: event_tx,
        };
        tokio::spawn(node.run());

        (NodeHandle { local, cmd_tx }, event_rx)
    }

    async fn run(mut self) {
        info!("peer node {} started", self.local);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Disconnect { reply }) => {
                            self.shutdown().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                Some(envelope) = self.signal_rx.recv() => {
                    self.handle_signal(envelope).await;
                }

                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }

                Some(update) = self.update_rx.recv() => {
                    self.handle_transfer_update(update);
                }
            }
        }

        info!("peer node {} stopped", self.local);
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::CreateRoom { reply } => {
                let entry = RosterEntry {
                    id: self.local.clone(),
                    name: self.config.display_name.clone(),
                };
                let result = self.store.create_room(entry, now_ms()).await;
                if let Ok(room) = &result {
                    self.start_relay(room.clone());
                }
                let _ = reply.send(result);
            }

            Command::JoinRoom { room, reply } => {
                let entry = RosterEntry {
                    id: self.local.clone(),
                    name: self.config.display_name.clone(),
                };
                let result = self.join_room(room, entry).await;
                let _ = reply.send(result);
            }

            Command::SendFile { peer, offer, reply } => {
                let _ = reply.send(self.start_send(peer, offer));
            }

            // Disconnect is intercepted in run() so it can break the loop.
            Command::Disconnect { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn join_room(&mut self, room: RoomId, entry: RosterEntry) -> Result<(), StoreError> {
        self.store.append_peer(&room, entry).await?;
        self.start_relay(room.clone());
        // Joiner announces itself and then waits: the peers observing this
        // join are the offerers, never the joiner (glare avoidance).
        self.send_signal(SignalTarget::Broadcast, SignalPayload::Join)
            .await;
        Ok(())
    }

    fn start_relay(&mut self, room: RoomId) {
        if let Some(old) = self.relay.take() {
            old.stop();
        }
        self.room = Some(room.clone());
        self.relay = Some(Relay::spawn(
            self.store.clone(),
            room,
            self.local.clone(),
            self.signal_tx.clone(),
            self.config.poll_interval,
        ));
    }

    fn start_send(
        &mut self,
        peer: PeerId,
        offer: FileOffer,
    ) -> Result<TransferId, SendFileError> {
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Err(SendFileError::UnknownPeer(peer));
        };
        let Some(channel) = session.channel.clone().filter(|c| c.is_open()) else {
            return Err(SendFileError::ChannelNotReady(peer));
        };

        let id = TransferId::new();
        let mut transfer = FileTransfer::new(
            id.clone(),
            peer,
            offer.name.clone(),
            offer.bytes.len() as u64,
            offer.mime_type.clone(),
            TransferDirection::Send,
        );
        transfer.status = TransferStatus::Transferring;
        self.transfers.insert(id.clone(), transfer);

        let handle = tokio::spawn(transfer::run_send(
            id.clone(),
            channel,
            offer,
            self.update_tx.clone(),
        ));
        session.outbound.insert(id.clone(), handle);

        Ok(id)
    }

    async fn handle_signal(&mut self, envelope: SignalEnvelope) {
        debug!(
            "signal {} from {} (seq {})",
            envelope.payload.kind(),
            envelope.from,
            envelope.seq
        );

        match envelope.payload {
            SignalPayload::Join => {
                self.on_join(envelope.from, envelope.from_name).await;
            }
            SignalPayload::Leave => {
                self.close_session(&envelope.from, "peer left the room").await;
            }
            SignalPayload::Offer { sdp } => {
                self.on_offer(envelope.from, envelope.from_name, sdp).await;
            }
            SignalPayload::Answer { sdp } => {
                self.on_answer(envelope.from, sdp).await;
            }
            SignalPayload::IceCandidate {
                candidate,
                sdp_mid,
                sdp_m_line_index,
            } => {
                let candidate = IceCandidate {
                    candidate,
                    sdp_mid,
                    sdp_m_line_index,
                };
                self.on_candidate(envelope.from, candidate).await;
            }
        }
    }

    /// Observing a join makes the local peer the offerer for that session.
    async fn on_join(&mut self, peer: PeerId, name: Option<String>) {
        if self.sessions.contains_key(&peer) {
            // A rejoin means the previous incarnation is gone.
            self.close_session(&peer, "peer rejoined").await;
        }

        match self
            .factory
            .create_offerer(
                peer.clone(),
                self.config.channel_mode,
                self.transport_tx.clone(),
            )
            .await
        {
            Ok((transport, offer_sdp)) => {
                self.sessions
                    .insert(peer.clone(), PeerSession::offerer(peer.clone(), name, transport));
                self.send_signal(
                    SignalTarget::Peer(peer),
                    SignalPayload::Offer { sdp: offer_sdp },
                )
                .await;
            }
            Err(e) => {
                warn!("failed to open transport toward {peer}: {e}");
                let _ = self.events.send(PeerEvent::NegotiationFailed {
                    peer,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn on_offer(&mut self, peer: PeerId, name: Option<String>, sdp: String) {
        if let Some(existing) = self.sessions.get(&peer) {
            // Two peers joining at the same moment can observe each other's
            // join and both offer; the lower id keeps the offerer role.
            if matches!(existing.state, NegotiationState::Negotiating(Role::Offerer))
                && self.local < peer
            {
                debug!("ignoring crossed offer from {peer}");
                return;
            }
            self.close_session(&peer, "superseded by a new offer").await;
        }

        match self
            .factory
            .create_answerer(peer.clone(), sdp, self.transport_tx.clone())
            .await
        {
            Ok((transport, answer_sdp)) => {
                let mut session = PeerSession::answerer(peer.clone(), name, transport);
                session.state = NegotiationState::ConnectionPending;
                self.sessions.insert(peer.clone(), session);
                self.send_signal(
                    SignalTarget::Peer(peer),
                    SignalPayload::Answer { sdp: answer_sdp },
                )
                .await;
            }
            Err(e) => {
                warn!("failed to answer offer from {peer}: {e}");
                let _ = self.events.send(PeerEvent::NegotiationFailed {
                    peer,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn on_answer(&mut self, peer: PeerId, sdp: String) {
        let Some(session) = self.sessions.get_mut(&peer) else {
            warn!("answer from {peer} without a session");
            let _ = self.events.send(PeerEvent::NegotiationFailed {
                peer,
                reason: "answer without a session".into(),
            });
            return;
        };

        if let Err(e) = session.accept_answer(sdp).await {
            warn!("negotiation with {peer} failed: {e}");
            let reason = e.to_string();
            self.close_session(&peer, "negotiation failed").await;
            let _ = self
                .events
                .send(PeerEvent::NegotiationFailed { peer, reason });
        }
    }

    async fn on_candidate(&mut self, peer: PeerId, candidate: IceCandidate) {
        let Some(session) = self.sessions.get_mut(&peer) else {
            // Candidates racing a session teardown are expected.
            debug!("dropping candidate from {peer}: no session");
            return;
        };
        session.add_candidate(candidate).await;
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(peer) => {
                let Some(session) = self.sessions.get_mut(&peer) else {
                    return;
                };
                if session.state == NegotiationState::Connected {
                    return;
                }
                session.state = NegotiationState::Connected;
                info!("peer {peer} connected");
                let _ = self.events.send(PeerEvent::PeerConnected {
                    peer,
                    name: session.display_name.clone(),
                });
            }

            TransportEvent::ChannelReady(peer, channel) => {
                if let Some(session) = self.sessions.get_mut(&peer) {
                    debug!("data channel ready for {peer}");
                    session.channel = Some(channel);
                }
            }

            TransportEvent::Message(peer, bytes) => {
                self.on_channel_message(peer, bytes);
            }

            TransportEvent::CandidateGenerated(peer, candidate) => {
                self.send_signal(
                    SignalTarget::Peer(peer),
                    SignalPayload::IceCandidate {
                        candidate: candidate.candidate,
                        sdp_mid: candidate.sdp_mid,
                        sdp_m_line_index: candidate.sdp_m_line_index,
                    },
                )
                .await;
            }

            TransportEvent::Disconnected(peer) => {
                self.close_session(&peer, "transport disconnected").await;
            }
        }
    }

    fn on_channel_message(&mut self, peer: PeerId, bytes: Bytes) {
        let packet = match transfer::decode_packet(&bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("malformed channel packet from {peer}: {e}");
                return;
            }
        };

        let Some(session) = self.sessions.get_mut(&peer) else {
            return;
        };

        match packet {
            ChannelPacket::FileStart {
                id,
                name,
                size,
                mime_type,
            } => {
                let mut transfer = FileTransfer::new(
                    id.clone(),
                    peer,
                    name,
                    size,
                    mime_type,
                    TransferDirection::Receive,
                );
                transfer.status = TransferStatus::Transferring;
                self.transfers.insert(id.clone(), transfer.clone());
                session
                    .inbound
                    .insert(id, InboundTransfer::new(transfer.clone()));
                let _ = self.events.send(PeerEvent::IncomingFile { transfer });
            }

            ChannelPacket::FileChunk { id, seq: _, bytes } => {
                let Some(inbound) = session.inbound.get_mut(&id) else {
                    debug!("chunk for unknown transfer {id}");
                    return;
                };
                inbound.push_chunk(bytes);

                let bytes_transferred = inbound.transfer.bytes_transferred;
                let percent = inbound.transfer.percent();
                if let Some(t) = self.transfers.get_mut(&id) {
                    t.bytes_transferred = bytes_transferred;
                }
                let _ = self.events.send(PeerEvent::TransferProgress {
                    id,
                    bytes_transferred,
                    percent,
                });
            }

            ChannelPacket::FileEnd { id } => {
                let Some(inbound) = session.inbound.remove(&id) else {
                    debug!("end for unknown transfer {id}");
                    return;
                };
                let (transfer, assembled) = inbound.finish();
                self.transfers.insert(id.clone(), transfer.clone());
                let _ = self
                    .events
                    .send(PeerEvent::TransferCompleted { id: id.clone() });
                let _ = self.events.send(PeerEvent::FileReceived {
                    id,
                    name: transfer.name,
                    mime_type: transfer.mime_type,
                    bytes: assembled,
                });
            }
        }
    }

    fn handle_transfer_update(&mut self, update: TransferUpdate) {
        match update {
            TransferUpdate::Progress { id, bytes } => {
                let Some(transfer) = self.transfers.get_mut(&id) else {
                    return;
                };
                if transfer.status != TransferStatus::Transferring {
                    return;
                }
                transfer.bytes_transferred = bytes;
                let _ = self.events.send(PeerEvent::TransferProgress {
                    id,
                    bytes_transferred: bytes,
                    percent: transfer.percent(),
                });
            }

            TransferUpdate::Completed { id } => {
                self.drop_outbound_handle(&id);
                let Some(transfer) = self.transfers.get_mut(&id) else {
                    return;
                };
                if transfer.status != TransferStatus::Transferring {
                    return;
                }
                transfer.status = TransferStatus::Completed;
                transfer.bytes_transferred = transfer.size;
                let _ = self.events.send(PeerEvent::TransferCompleted { id });
            }

            TransferUpdate::Failed { id, reason } => {
                self.drop_outbound_handle(&id);
                self.fail_transfer(&id, &reason);
            }
        }
    }

    fn drop_outbound_handle(&mut self, id: &TransferId) {
        for session in self.sessions.values_mut() {
            session.outbound.remove(id);
        }
    }

    fn fail_transfer(&mut self, id: &TransferId, reason: &str) {
        let Some(transfer) = self.transfers.get_mut(id) else {
            return;
        };
        if matches!(
            transfer.status,
            TransferStatus::Completed | TransferStatus::Failed
        ) {
            return;
        }
        transfer.status = TransferStatus::Failed;
        let _ = self.events.send(PeerEvent::TransferFailed {
            id: id.clone(),
            reason: reason.to_owned(),
        });
    }

    /// Terminal session teardown: aborts in-flight transfers, releases the
    /// transport, and fires peer-disconnected (once) if the peer had been
    /// reported connected. A later join or offer builds a fresh session.
    async fn close_session(&mut self, peer: &PeerId, reason: &str) {
        let Some(mut session) = self.sessions.remove(peer) else {
            return;
        };
        debug!("closing session for {peer}: {reason}");

        let outbound: Vec<TransferId> = session.outbound.keys().cloned().collect();
        for (_, handle) in session.outbound.drain() {
            handle.abort();
        }
        let inbound: Vec<TransferId> = session.inbound.keys().cloned().collect();
        session.inbound.clear();

        let was_connected = session.state == NegotiationState::Connected;
        session.transport.close().await;

        for id in outbound.iter().chain(inbound.iter()) {
            self.fail_transfer(id, "peer disconnected");
        }

        if was_connected {
            let _ = self
                .events
                .send(PeerEvent::PeerDisconnected { peer: peer.clone() });
        }
    }

    /// Appends an outgoing signal to the room log. Store failures degrade to
    /// local-only operation: logged, never fatal.
    async fn send_signal(&mut self, to: SignalTarget, payload: SignalPayload) {
        let Some(room) = &self.room else {
            return;
        };
        let kind = payload.kind();
        let draft = SignalDraft {
            from: self.local.clone(),
            to,
            payload,
            from_name: self.config.display_name.clone(),
            timestamp_ms: now_ms(),
        };
        if let Err(e) = self.store.append_message(room, draft).await {
            warn!("failed to append {kind} signal: {e}");
            return;
        }
        if let Some(relay) = &self.relay {
            relay.nudge();
        }
    }

    async fn shutdown(&mut self) {
        self.send_signal(SignalTarget::Broadcast, SignalPayload::Leave)
            .await;
        if let Some(relay) = self.relay.take() {
            relay.stop();
        }
        let peers: Vec<PeerId> = self.sessions.keys().cloned().collect();
        for peer in peers {
            self.close_session(&peer, "local disconnect").await;
        }
    }
}
