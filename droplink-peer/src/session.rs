use crate::transfer::InboundTransfer;
use crate::transport::{DynChannel, IceCandidate, PeerTransport};
use droplink_core::{NegotiationError, PeerId, TransferId};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

/// Per-peer negotiation progress. Absence of a session is the idle state;
/// removal is terminal, and a later join or offer builds a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Negotiating(Role),
    ConnectionPending,
    Connected,
}

impl NegotiationState {
    pub fn name(&self) -> &'static str {
        match self {
            NegotiationState::Negotiating(Role::Offerer) => "negotiating(offerer)",
            NegotiationState::Negotiating(Role::Answerer) => "negotiating(answerer)",
            NegotiationState::ConnectionPending => "connection-pending",
            NegotiationState::Connected => "connected",
        }
    }
}

/// Everything the node tracks for one remote peer: the negotiation state,
/// the transport under negotiation, the data channel once open, and the
/// transfers riding on it.
pub struct PeerSession {
    pub peer: PeerId,
    pub display_name: Option<String>,
    pub state: NegotiationState,
    pub transport: Box<dyn PeerTransport>,
    pub channel: Option<DynChannel>,
    pub outbound: HashMap<TransferId, JoinHandle<()>>,
    pub inbound: HashMap<TransferId, InboundTransfer>,
    /// Candidates cannot be applied until the transport holds the remote
    /// description: immediately for an answerer, after the answer for an
    /// offerer. Until then they are buffered here.
    remote_ready: bool,
    pending_candidates: Vec<IceCandidate>,
}

impl PeerSession {
    pub fn offerer(
        peer: PeerId,
        display_name: Option<String>,
        transport: Box<dyn PeerTransport>,
    ) -> Self {
        Self::new(peer, display_name, transport, Role::Offerer, false)
    }

    pub fn answerer(
        peer: PeerId,
        display_name: Option<String>,
        transport: Box<dyn PeerTransport>,
    ) -> Self {
        Self::new(peer, display_name, transport, Role::Answerer, true)
    }

    fn new(
        peer: PeerId,
        display_name: Option<String>,
        transport: Box<dyn PeerTransport>,
        role: Role,
        remote_ready: bool,
    ) -> Self {
        Self {
            peer,
            display_name,
            state: NegotiationState::Negotiating(role),
            transport,
            channel: None,
            outbound: HashMap::new(),
            inbound: HashMap::new(),
            remote_ready,
            pending_candidates: Vec::new(),
        }
    }

    pub fn channel_open(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }

    /// Applies a remote answer. Valid only for an offerer that has not
    /// connected yet; anything else is an out-of-sequence answer.
    pub async fn accept_answer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        match self.state {
            NegotiationState::Negotiating(Role::Offerer) | NegotiationState::ConnectionPending => {
                self.transport.apply_answer(sdp).await?;
                self.state = NegotiationState::ConnectionPending;
                self.remote_ready = true;
                self.flush_candidates().await;
                Ok(())
            }
            _ => Err(NegotiationError::OutOfSequence {
                peer: self.peer.clone(),
                kind: "answer",
                state: self.state.name(),
            }),
        }
    }

    /// Applies a remote candidate in any state, buffering it while the
    /// transport cannot accept candidates yet. Late candidates after a
    /// session is connected are normal trickle behavior.
    pub async fn add_candidate(&mut self, candidate: IceCandidate) {
        if !self.remote_ready {
            self.pending_candidates.push(candidate);
            return;
        }
        if let Err(e) = self.transport.add_remote_candidate(candidate).await {
            warn!("failed to add candidate for {}: {e}", self.peer);
        }
    }

    async fn flush_candidates(&mut self) {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.transport.add_remote_candidate(candidate).await {
                warn!("failed to add buffered candidate for {}: {e}", self.peer);
            }
        }
    }
}
