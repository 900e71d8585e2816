use crate::model::peer::PeerId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Addressee of a signaling message: one peer, or everyone in the room.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum SignalTarget {
    Broadcast,
    Peer(PeerId),
}

impl SignalTarget {
    pub fn includes(&self, peer: &PeerId) -> bool {
        match self {
            SignalTarget::Broadcast => true,
            SignalTarget::Peer(id) => id == peer,
        }
    }
}

impl Serialize for SignalTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SignalTarget::Broadcast => serializer.serialize_str("broadcast"),
            SignalTarget::Peer(id) => id.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SignalTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "broadcast" {
            return Ok(SignalTarget::Broadcast);
        }
        PeerId::from_str(&s)
            .map(SignalTarget::Peer)
            .map_err(D::Error::custom)
    }
}

/// Connection-setup payload, closed by construction: anything that does not
/// deserialize into one of these variants is quarantined by the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalPayload {
    Join,
    Leave,
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    IceCandidate {
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
    },
}

impl SignalPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalPayload::Join => "join",
            SignalPayload::Leave => "leave",
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::IceCandidate { .. } => "ice-candidate",
        }
    }
}

/// A signaling message as the sender hands it to the mailbox. The store
/// assigns the log position and owns the `processed_by` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDraft {
    pub from: PeerId,
    pub to: SignalTarget,
    #[serde(flatten)]
    pub payload: SignalPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

/// A signaling message as it sits in a room's append-only log.
///
/// `processed_by` is multi-writer: every reader adds itself after dispatch,
/// and stores must merge concurrent marks by set-union.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    pub seq: u64,
    pub from: PeerId,
    pub to: SignalTarget,
    #[serde(flatten)]
    pub payload: SignalPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub processed_by: BTreeSet<PeerId>,
}

impl SignalEnvelope {
    pub fn from_draft(seq: u64, draft: SignalDraft) -> Self {
        Self {
            seq,
            from: draft.from,
            to: draft.to,
            payload: draft.payload,
            from_name: draft.from_name,
            timestamp_ms: draft.timestamp_ms,
            processed_by: BTreeSet::new(),
        }
    }
}
