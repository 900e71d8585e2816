pub mod error;
pub mod model;

pub use error::{NegotiationError, SendFileError, StoreError, TransferError, TransportError};
pub use model::{
    ChannelMode, ChannelPacket, FileTransfer, PeerId, Room, RoomId, RosterEntry, SignalDraft,
    SignalEnvelope, SignalPayload, SignalTarget, TransferDirection, TransferId, TransferStatus,
    CHUNK_SIZE,
};
