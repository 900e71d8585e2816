use crate::transport::DynChannel;
use bytes::Bytes;
use droplink_core::{
    ChannelPacket, FileTransfer, TransferError, TransferId, TransferStatus, CHUNK_SIZE,
};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

/// A file handed to `send_file`: contents plus the metadata the receiver
/// shows before the bytes arrive.
#[derive(Debug, Clone)]
pub struct FileOffer {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl FileOffer {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_owned());
        Ok(Self::new(name, "application/octet-stream", Bytes::from(bytes)))
    }
}

/// Status messages a send task reports back into the node loop.
#[derive(Debug)]
pub enum TransferUpdate {
    Progress { id: TransferId, bytes: u64 },
    Completed { id: TransferId },
    Failed { id: TransferId, reason: String },
}

pub fn encode_packet(packet: &ChannelPacket) -> Result<Bytes, TransferError> {
    postcard::to_allocvec(packet)
        .map(Bytes::from)
        .map_err(|e| TransferError::Decode(e.to_string()))
}

pub fn decode_packet(bytes: &[u8]) -> Result<ChannelPacket, TransferError> {
    postcard::from_bytes(bytes).map_err(|e| TransferError::Decode(e.to_string()))
}

async fn send_packet(channel: &DynChannel, packet: &ChannelPacket) -> Result<(), TransferError> {
    let bytes = encode_packet(packet)?;
    channel.send(bytes).await?;
    Ok(())
}

/// Task body for one outbound transfer. Chunks are sent strictly one after
/// another; each `send` is awaited before the next chunk so the channel's
/// send buffer applies backpressure. A failure anywhere surfaces as a
/// `Failed` update, never a silent truncation.
pub async fn run_send(
    id: TransferId,
    channel: DynChannel,
    offer: FileOffer,
    updates: mpsc::UnboundedSender<TransferUpdate>,
) {
    if let Err(e) = send_file(&id, &channel, &offer, &updates).await {
        let _ = updates.send(TransferUpdate::Failed {
            id,
            reason: e.to_string(),
        });
    }
}

async fn send_file(
    id: &TransferId,
    channel: &DynChannel,
    offer: &FileOffer,
    updates: &mpsc::UnboundedSender<TransferUpdate>,
) -> Result<(), TransferError> {
    send_packet(
        channel,
        &ChannelPacket::FileStart {
            id: id.clone(),
            name: offer.name.clone(),
            size: offer.bytes.len() as u64,
            mime_type: offer.mime_type.clone(),
        },
    )
    .await?;

    let mut sent = 0u64;
    for (seq, chunk) in offer.bytes.chunks(CHUNK_SIZE).enumerate() {
        send_packet(
            channel,
            &ChannelPacket::FileChunk {
                id: id.clone(),
                seq: seq as u64,
                bytes: chunk.to_vec(),
            },
        )
        .await?;

        sent += chunk.len() as u64;
        let _ = updates.send(TransferUpdate::Progress {
            id: id.clone(),
            bytes: sent,
        });
    }

    send_packet(channel, &ChannelPacket::FileEnd { id: id.clone() }).await?;
    debug!("transfer {id} sent: {} bytes", offer.bytes.len());

    let _ = updates.send(TransferUpdate::Completed { id: id.clone() });
    Ok(())
}

/// Accumulation state for one inbound transfer: chunks are appended in
/// arrival order and concatenated at `FileEnd`. Ordering and loss protection
/// come from the channel's reliable mode, not from this buffer.
pub struct InboundTransfer {
    pub transfer: FileTransfer,
    chunks: Vec<Vec<u8>>,
}

impl InboundTransfer {
    pub fn new(transfer: FileTransfer) -> Self {
        Self {
            transfer,
            chunks: Vec::new(),
        }
    }

    pub fn push_chunk(&mut self, bytes: Vec<u8>) {
        self.transfer.bytes_transferred += bytes.len() as u64;
        self.chunks.push(bytes);
    }

    /// Concatenates the accumulated chunks into the final byte sequence.
    pub fn finish(mut self) -> (FileTransfer, Bytes) {
        let total: usize = self.chunks.iter().map(Vec::len).sum();
        let mut assembled = Vec::with_capacity(total);
        for chunk in &self.chunks {
            assembled.extend_from_slice(chunk);
        }
        self.transfer.status = TransferStatus::Completed;
        (self.transfer, Bytes::from(assembled))
    }
}
