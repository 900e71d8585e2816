use serde::{Deserialize, Serialize};

/// Delivery mode requested when the negotiated data channel is created.
/// The file-transfer protocol has no reassembly of its own and is only
/// correct over `Reliable` (ordered, lossless) delivery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelMode {
    Reliable,
    ReliableUnordered,
    Unreliable,
}

impl Default for ChannelMode {
    fn default() -> Self {
        Self::Reliable
    }
}
