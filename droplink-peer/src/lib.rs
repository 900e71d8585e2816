pub mod mailbox;
pub mod node;
pub mod relay;
pub mod session;
pub mod transfer;
pub mod transport;

mod events;

pub mod model {
    pub use droplink_core::model::*;
}

pub use events::PeerEvent;
pub use mailbox::{HttpMailbox, MailboxStore, MemoryMailbox};
pub use node::{NodeConfig, NodeHandle, PeerNode};
pub use relay::select_inbox;
pub use session::{NegotiationState, PeerSession, Role};
pub use transfer::{FileOffer, InboundTransfer, TransferUpdate};
pub use transport::{
    ChannelHandle, DynChannel, IceCandidate, PeerTransport, RtcConfig, RtcTransportFactory,
    TransportEvent, TransportFactory,
};
