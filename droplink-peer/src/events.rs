use bytes::Bytes;
use droplink_core::{FileTransfer, PeerId, TransferId};

/// Everything the node reports upward. Consumed as a plain channel so the
/// core is usable without a UI layer and tests can assert on event order.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    PeerConnected {
        peer: PeerId,
        name: Option<String>,
    },
    PeerDisconnected {
        peer: PeerId,
    },
    NegotiationFailed {
        peer: PeerId,
        reason: String,
    },
    IncomingFile {
        transfer: FileTransfer,
    },
    TransferProgress {
        id: TransferId,
        bytes_transferred: u64,
        percent: f64,
    },
    TransferCompleted {
        id: TransferId,
    },
    TransferFailed {
        id: TransferId,
        reason: String,
    },
    FileReceived {
        id: TransferId,
        name: String,
        mime_type: String,
        bytes: Bytes,
    },
}
