use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Chunk size for file sends: large enough to amortize per-message overhead,
/// small enough to keep channel send buffers bounded.
pub const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct TransferId(pub Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Send,
    Receive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Transferring,
    Completed,
    Failed,
}

/// Book-keeping for one file moving in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTransfer {
    pub id: TransferId,
    pub peer: PeerId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub direction: TransferDirection,
    pub status: TransferStatus,
    pub bytes_transferred: u64,
}

impl FileTransfer {
    pub fn new(
        id: TransferId,
        peer: PeerId,
        name: String,
        size: u64,
        mime_type: String,
        direction: TransferDirection,
    ) -> Self {
        Self {
            id,
            peer,
            name,
            size,
            mime_type,
            direction,
            status: TransferStatus::Pending,
            bytes_transferred: 0,
        }
    }

    /// Progress in percent, clamped to [0, 100]. An empty file is complete
    /// the moment it exists.
    pub fn percent(&self) -> f64 {
        if self.size == 0 {
            return 100.0;
        }
        let pct = self.bytes_transferred as f64 / self.size as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }
}
