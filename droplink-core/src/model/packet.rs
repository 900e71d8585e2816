use crate::model::transfer::TransferId;
use serde::{Deserialize, Serialize};

/// Control messages carried over the negotiated data channel, postcard-encoded.
/// One file send is the sequence FileStart, FileChunk (seq 0..), FileEnd.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelPacket {
    FileStart {
        id: TransferId,
        name: String,
        size: u64,
        mime_type: String,
    },
    FileChunk {
        id: TransferId,
        seq: u64,
        #[serde(with = "serde_bytes")]
        bytes: Vec<u8>,
    },
    FileEnd {
        id: TransferId,
    },
}
