mod rtc;

pub use rtc::{RtcConfig, RtcTransportFactory};

use async_trait::async_trait;
use bytes::Bytes;
use droplink_core::{ChannelMode, PeerId, TransportError};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One network-path candidate, shaped after the signaling wire format.
#[derive(Debug, Clone)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

pub type DynChannel = Arc<dyn ChannelHandle>;

/// Events a transport pushes into the node's event loop.
pub enum TransportEvent {
    Connected(PeerId),
    ChannelReady(PeerId, DynChannel),
    Message(PeerId, Bytes),
    CandidateGenerated(PeerId, IceCandidate),
    Disconnected(PeerId),
}

/// The bidirectional message stream once negotiation completes.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    fn is_open(&self) -> bool;
    async fn send(&self, bytes: Bytes) -> Result<(), TransportError>;
}

/// One negotiated (or negotiating) connection to a remote peer. The concrete
/// transport is a black box behind this seam; events flow out through the
/// `mpsc::Sender<TransportEvent>` handed to the factory.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn apply_answer(&self, sdp: String) -> Result<(), TransportError>;
    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;
    async fn close(&self);
}

/// Creates transports in either negotiation role. Both constructors return
/// the local session description to be relayed to the remote side.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create_offerer(
        &self,
        remote: PeerId,
        mode: ChannelMode,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(Box<dyn PeerTransport>, String), TransportError>;

    async fn create_answerer(
        &self,
        remote: PeerId,
        remote_offer: String,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(Box<dyn PeerTransport>, String), TransportError>;
}
