use crate::model::peer::{PeerId, RosterEntry};
use crate::model::signaling::{SignalDraft, SignalEnvelope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RoomId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One room's shared state: membership roster plus the append-only signaling
/// log. The mutating methods carry the merge semantics every store must keep:
/// roster membership is unique by id, log appends assign the next sequence
/// number, and processed-marks union rather than overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub creator: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    pub peers: Vec<RosterEntry>,
    pub messages: Vec<SignalEnvelope>,
    #[serde(rename = "createdAt")]
    pub created_at_ms: u64,
}

impl Room {
    pub fn new(creator: PeerId, creator_name: Option<String>, created_at_ms: u64) -> Self {
        Self {
            id: RoomId::new(),
            creator: creator.clone(),
            creator_name: creator_name.clone(),
            peers: vec![RosterEntry {
                id: creator,
                name: creator_name,
            }],
            messages: Vec::new(),
            created_at_ms,
        }
    }

    /// Idempotent roster append: a second append with the same peer id is a
    /// no-op, even if the display name differs.
    pub fn append_peer(&mut self, entry: RosterEntry) {
        if self.peers.iter().any(|p| p.id == entry.id) {
            return;
        }
        self.peers.push(entry);
    }

    /// Appends to the log and returns the assigned sequence number.
    pub fn append_message(&mut self, draft: SignalDraft) -> u64 {
        let seq = self.messages.len() as u64;
        self.messages.push(SignalEnvelope::from_draft(seq, draft));
        seq
    }

    /// Marks the given log entries as processed by `reader`. Unknown seqs are
    /// ignored; marks already present stay present (set-union).
    pub fn mark_processed(&mut self, seqs: &[u64], reader: &PeerId) {
        let seqs: BTreeSet<u64> = seqs.iter().copied().collect();
        for msg in &mut self.messages {
            if seqs.contains(&msg.seq) {
                msg.processed_by.insert(reader.clone());
            }
        }
    }
}
