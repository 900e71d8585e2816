use crate::model::PeerId;
use thiserror::Error;

/// Mailbox read/write failures. `Unavailable` is the expected transient case:
/// the relay logs it and retries on the next poll.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mailbox unavailable: {0}")]
    Unavailable(String),
    #[error("room not found")]
    NotFound,
    #[error("invalid store payload: {0}")]
    Invalid(String),
}

/// Failures inside the transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("data channel is not open")]
    ChannelClosed,
    #[error("transport failure: {0}")]
    Failed(String),
}

/// A negotiation failure scoped to one remote peer. Closing that session is
/// the whole blast radius; other sessions are untouched.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("no active session for peer {0}")]
    NoSession(PeerId),
    #[error("unexpected {kind} from peer {peer} in state {state}")]
    OutOfSequence {
        peer: PeerId,
        kind: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Synchronous rejection of a `send_file` call.
#[derive(Debug, Error)]
pub enum SendFileError {
    #[error("no session for peer {0}")]
    UnknownPeer(PeerId),
    #[error("data channel for peer {0} is not open")]
    ChannelNotReady(PeerId),
    #[error("peer node is shut down")]
    NodeClosed,
}

/// Mid-stream transfer failure: the transfer is marked failed and surfaced
/// to the caller, partial data is discarded.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Send(#[from] TransportError),
    #[error("peer disconnected mid-transfer")]
    Aborted,
    #[error("malformed channel packet: {0}")]
    Decode(String),
}
