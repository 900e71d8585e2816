pub mod api;

mod channel;
mod packet;
mod peer;
mod room;
mod signaling;
mod transfer;

pub use channel::ChannelMode;
pub use packet::ChannelPacket;
pub use peer::{PeerId, RosterEntry};
pub use room::{Room, RoomId};
pub use signaling::{SignalDraft, SignalEnvelope, SignalPayload, SignalTarget};
pub use transfer::{
    FileTransfer, TransferDirection, TransferId, TransferStatus, CHUNK_SIZE,
};
